use std::sync::Arc;

use tracing::{error, info};

use crate::errors::problem::Problem;
use crate::repositories::MessageRepository;

/// Assigns per-conversation chat ids to messages after they are persisted.
///
/// Assignment is detached from the request that created the message. Messages whose
/// assignment failed keep a null `chat_id` until [`ChatService::reconcile`] picks them up.
#[derive(Clone)]
pub struct ChatService {
        message_repository: Arc<dyn MessageRepository>,
}

impl ChatService {
        pub fn new(message_repository: Arc<dyn MessageRepository>) -> Self {
                Self { message_repository }
        }

        pub fn request_chat_id(&self, message_id: i64) -> tokio::task::JoinHandle<()> {
                let message_repository = self.message_repository.clone();

                tokio::task::spawn_blocking(move || {
                        if let Err(err) = message_repository.assign_next_chat_id(message_id) {
                                error!("cannot increment the chat id of message {}: {}", message_id, err);
                        }
                })
        }

        pub fn reconcile(&self, batch_size: i64) -> Result<usize, Problem> {
                let pending = self.message_repository.find_without_chat_id(batch_size)?;

                let mut assigned = 0;
                for message in pending {
                        match self.message_repository.assign_next_chat_id(message.id) {
                                Ok(_) => assigned += 1,
                                Err(err) => error!("cannot increment the chat id of message {}: {}", message.id, err),
                        }
                }

                if assigned > 0 {
                        info!("reconciled chat ids for {} messages", assigned);
                }
                Ok(assigned)
        }
}
