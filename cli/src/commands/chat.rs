use anyhow::Result;

use liftlog_core::models::{
    AiConversation, MessageMetadata, MessageRole, NewAiConversation, NewAiMessage, new_id,
};
use liftlog_core::service::FitnessService;

use super::helpers::{empty_list, local_time, nothing_found, print_json, truncate};

pub(crate) async fn cmd_chat_new(
    svc: &FitnessService,
    user_id: &str,
    title: &str,
    json: bool,
) -> Result<()> {
    let conversation = svc
        .store()
        .create_conversation(NewAiConversation {
            id: new_id(),
            user_id: user_id.to_string(),
            title: title.to_string(),
        })
        .await?;

    if json {
        print_json(&conversation)?;
    } else {
        println!("Started '{}' (id: {})", conversation.title, conversation.id);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct MessageFlags {
    pub workout: bool,
    pub nutrition: bool,
    pub form: bool,
}

impl MessageFlags {
    fn into_metadata(self) -> Option<MessageMetadata> {
        let flag = |set: bool| set.then_some(true);
        let meta = MessageMetadata {
            workout_generated: flag(self.workout),
            nutrition_advice: flag(self.nutrition),
            exercise_form: flag(self.form),
        };
        (meta != MessageMetadata::default()).then_some(meta)
    }
}

pub(crate) async fn cmd_chat_say(
    svc: &FitnessService,
    conversation_id: &str,
    role: MessageRole,
    content: &str,
    flags: MessageFlags,
    json: bool,
) -> Result<()> {
    let message = svc
        .store()
        .add_message(NewAiMessage {
            id: new_id(),
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            role,
            metadata: flags.into_metadata(),
        })
        .await?;

    if json {
        print_json(&message)?;
    } else {
        println!("Added {} message (id: {})", message.role, message.id);
    }
    Ok(())
}

fn print_conversation(c: &AiConversation) {
    println!("{} (id: {})", c.title, c.id);
    for m in &c.messages {
        println!("  [{}] {}: {}", local_time(&m.created_at), m.role, m.content);
    }
}

pub(crate) async fn cmd_chat_show(svc: &FitnessService, id: &str, json: bool) -> Result<()> {
    let Some(conversation) = svc.store().get_conversation(id).await? else {
        nothing_found(json, &format!("No conversation with id '{id}'"));
    };
    if json {
        print_json(&conversation)?;
    } else {
        print_conversation(&conversation);
    }
    Ok(())
}

pub(crate) async fn cmd_chat_list(svc: &FitnessService, user_id: &str, json: bool) -> Result<()> {
    let conversations = svc.store().get_conversations(user_id).await?;
    if conversations.is_empty() {
        empty_list(json, "No conversations yet. Use `liftlog chat new <title>`");
    }
    if json {
        return print_json(&conversations);
    }
    for c in &conversations {
        let last = c
            .messages
            .last()
            .map(|m| truncate(&m.content, 50))
            .unwrap_or_default();
        println!(
            "{}  {}  ({} messages, updated {})",
            c.id,
            c.title,
            c.messages.len(),
            local_time(&c.updated_at)
        );
        if !last.is_empty() {
            println!("    {last}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_without_any_set_have_no_metadata() {
        assert!(MessageFlags::default().into_metadata().is_none());
    }

    #[test]
    fn test_flags_map_to_metadata() {
        let meta = MessageFlags {
            nutrition: true,
            ..Default::default()
        }
        .into_metadata()
        .unwrap();
        assert_eq!(meta.nutrition_advice, Some(true));
        assert_eq!(meta.workout_generated, None);
    }
}
