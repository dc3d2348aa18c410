use rusqlite::params;

use super::{Database, enum_col, now_text, ts_col};
use crate::error::{StorageError, StorageResult};
use crate::models::{AiConversation, AiMessage, MessageRole, NewAiConversation, NewAiMessage};

fn conversation_from_row(row: &rusqlite::Row) -> rusqlite::Result<AiConversation> {
    Ok(AiConversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        messages: Vec::new(),
        created_at: ts_col(row, 3)?,
        updated_at: ts_col(row, 4)?,
    })
}

fn message_from_row(row: &rusqlite::Row) -> rusqlite::Result<AiMessage> {
    let metadata: Option<String> = row.get(4)?;
    let metadata = metadata
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(AiMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        content: row.get(2)?,
        role: enum_col::<MessageRole>(row, 3)?,
        metadata,
        created_at: ts_col(row, 5)?,
    })
}

impl Database {
    fn conversation_messages(&self, conversation_id: &str) -> StorageResult<Vec<AiMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, conversation_id, content, role, metadata, created_at
             FROM ai_messages WHERE conversation_id = ?1 ORDER BY created_at, rowid",
        )?;
        let messages = stmt
            .query_map(params![conversation_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub fn create_conversation(
        &self,
        conversation: &NewAiConversation,
    ) -> StorageResult<AiConversation> {
        let title = conversation.title.trim();
        if title.is_empty() {
            return Err(StorageError::InvalidData(
                "Conversation title must not be empty".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO ai_conversations (id, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![conversation.id, conversation.user_id, title, now_text()],
        )?;
        self.get_conversation(&conversation.id)?
            .ok_or_else(|| StorageError::not_found("conversation", &conversation.id))
    }

    /// Appends a message and bumps the conversation's `updated_at`.
    pub fn add_message(&mut self, message: &NewAiMessage) -> StorageResult<AiMessage> {
        if message.content.trim().is_empty() {
            return Err(StorageError::InvalidData(
                "Message content must not be empty".to_string(),
            ));
        }
        let metadata = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = now_text();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO ai_messages (id, conversation_id, content, role, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.conversation_id,
                message.content,
                message.role.as_str(),
                metadata,
                now,
            ],
        )?;
        tx.execute(
            "UPDATE ai_conversations SET updated_at = ?1 WHERE id = ?2",
            params![now, message.conversation_id],
        )?;
        let stored = {
            let mut stmt = tx.prepare(
                "SELECT id, conversation_id, content, role, metadata, created_at
                 FROM ai_messages WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![message.id])?;
            match rows.next()? {
                Some(row) => message_from_row(row)?,
                None => return Err(StorageError::not_found("message", &message.id)),
            }
        };
        tx.commit()?;
        Ok(stored)
    }

    pub fn get_conversation(&self, id: &str) -> StorageResult<Option<AiConversation>> {
        let conversation = {
            let mut stmt = self.conn.prepare(
                "SELECT id, user_id, title, created_at, updated_at
                 FROM ai_conversations WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => conversation_from_row(row)?,
                None => return Ok(None),
            }
        };
        let messages = self.conversation_messages(&conversation.id)?;
        Ok(Some(AiConversation {
            messages,
            ..conversation
        }))
    }

    /// Most recently updated first, messages included.
    pub fn get_conversations(&self, user_id: &str) -> StorageResult<Vec<AiConversation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, created_at, updated_at
             FROM ai_conversations WHERE user_id = ?1
             ORDER BY updated_at DESC, rowid DESC",
        )?;
        let mut conversations = stmt
            .query_map(params![user_id], conversation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for conversation in &mut conversations {
            conversation.messages = self.conversation_messages(&conversation.id)?;
        }
        Ok(conversations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::db_with_user;
    use crate::models::MessageMetadata;

    fn message(id: &str, conversation: &str, role: MessageRole, content: &str) -> NewAiMessage {
        NewAiMessage {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            content: content.to_string(),
            role,
            metadata: None,
        }
    }

    fn conversation(id: &str, title: &str) -> NewAiConversation {
        NewAiConversation {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_messages_ordered_with_metadata() {
        let mut db = db_with_user("u1");
        db.create_conversation(&conversation("c1", "Leg day plan")).unwrap();
        db.add_message(&message("m1", "c1", MessageRole::User, "Plan my leg day"))
            .unwrap();
        db.add_message(&NewAiMessage {
            metadata: Some(MessageMetadata {
                workout_generated: Some(true),
                ..Default::default()
            }),
            ..message("m2", "c1", MessageRole::Assistant, "Squats, 5x5")
        })
        .unwrap();

        let convo = db.get_conversation("c1").unwrap().unwrap();
        assert_eq!(convo.messages.len(), 2);
        assert_eq!(convo.messages[0].role, MessageRole::User);
        assert!(convo.messages[0].metadata.is_none());
        let meta = convo.messages[1].metadata.as_ref().unwrap();
        assert_eq!(meta.workout_generated, Some(true));
        assert_eq!(meta.nutrition_advice, None);
        assert!(convo.updated_at >= convo.created_at);
    }

    #[test]
    fn test_message_requires_conversation() {
        let mut db = db_with_user("u1");
        let err = db
            .add_message(&message("m1", "ghost", MessageRole::User, "hello"))
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKey(_)), "{err:?}");
    }

    #[test]
    fn test_conversations_most_recently_updated_first() {
        let mut db = db_with_user("u1");
        db.create_conversation(&conversation("c1", "First")).unwrap();
        db.create_conversation(&conversation("c2", "Second")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        db.add_message(&message("m1", "c1", MessageRole::User, "bump"))
            .unwrap();

        let convos = db.get_conversations("u1").unwrap();
        let ids: Vec<&str> = convos.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(convos[0].messages.len(), 1);
    }

    #[test]
    fn test_delete_user_removes_conversations() {
        let mut db = db_with_user("u1");
        db.create_conversation(&conversation("c1", "First")).unwrap();
        db.add_message(&message("m1", "c1", MessageRole::User, "hi"))
            .unwrap();
        db.delete_user("u1").unwrap();
        assert!(db.get_conversation("c1").unwrap().is_none());
    }
}
