use chrono::Utc;
use derive_new::new;
use diesel::prelude::*;

use crate::errors::problem::Problem;
use crate::models::Message;
use crate::repositories::{connection, map_db_error, DbPool, MessageRepository};
use crate::schema::{chat_counters, messages};

#[derive(new, Debug, Clone)]
pub struct PgMessageRepository {
        pool: DbPool,
}

impl MessageRepository for PgMessageRepository {
        fn save(&self, message: Message) -> Result<Message, Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::insert_into(messages::table)
                        .values(&message)
                        .on_conflict(messages::id)
                        .do_update()
                        .set(&message)
                        .get_result(&mut connection)
                        .map_err(map_db_error)
        }

        fn assign_next_chat_id(&self, message_id: i64) -> Result<i64, Problem> {
                let mut connection = connection(&self.pool)?;

                connection
                        .transaction::<i64, diesel::result::Error, _>(|connection| {
                                let message = messages::table
                                        .find(message_id)
                                        .for_update()
                                        .first::<Message>(connection)?;

                                if let Some(chat_id) = message.chat_id {
                                        return Ok(chat_id);
                                }

                                let (low_user_id, high_user_id) = message.conversation();
                                let chat_id = diesel::insert_into(chat_counters::table)
                                        .values((
                                                chat_counters::low_user_id.eq(low_user_id),
                                                chat_counters::high_user_id.eq(high_user_id),
                                                chat_counters::seq.eq(1),
                                        ))
                                        .on_conflict((chat_counters::low_user_id, chat_counters::high_user_id))
                                        .do_update()
                                        .set(chat_counters::seq.eq(chat_counters::seq + 1))
                                        .returning(chat_counters::seq)
                                        .get_result::<i64>(connection)?;

                                diesel::update(messages::table.find(message_id))
                                        .set((
                                                messages::chat_id.eq(chat_id),
                                                messages::updated_at.eq(Utc::now().naive_utc()),
                                        ))
                                        .execute(connection)?;

                                Ok(chat_id)
                        })
                        .map_err(map_db_error)
        }

        fn find_without_chat_id(&self, limit: i64) -> Result<Vec<Message>, Problem> {
                let mut connection = connection(&self.pool)?;

                messages::table
                        .filter(messages::chat_id.is_null())
                        .order_by(messages::created_at.asc())
                        .limit(limit)
                        .load(&mut connection)
                        .map_err(map_db_error)
        }
}
