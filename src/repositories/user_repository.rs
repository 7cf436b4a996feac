use chrono::Utc;
use derive_new::new;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::errors::problem::Problem;
use crate::models::{Provider, User, UserFollow};
use crate::repositories::{connection, map_db_error, DbPool, Page, UserRepository};
use crate::schema::{user_follows, users};

#[derive(QueryableByName)]
struct SequenceValue {
        #[diesel(sql_type = BigInt)]
        value: i64,
}

#[derive(new, Debug, Clone)]
pub struct PgUserRepository {
        pool: DbPool,
}

fn escape_like(term: &str) -> String {
        term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn searched<'a>(keywords: &[String]) -> users::BoxedQuery<'a, Pg> {
        let mut query = users::table.into_boxed();

        for keyword in keywords {
                let pattern = format!("%{}%", escape_like(keyword));
                query = query.filter(users::email.ilike(pattern.clone()).or(users::display_name.ilike(pattern)));
        }

        query
}

impl UserRepository for PgUserRepository {
        fn find_by_id(&self, id: i64) -> Result<Option<User>, Problem> {
                let mut connection = connection(&self.pool)?;

                users::table.find(id).first(&mut connection).optional().map_err(map_db_error)
        }

        fn find_by_email(&self, email: &str) -> Result<Option<User>, Problem> {
                let mut connection = connection(&self.pool)?;

                users::table
                        .filter(users::email.eq(email.trim().to_lowercase()))
                        .first(&mut connection)
                        .optional()
                        .map_err(map_db_error)
        }

        fn find_by_provider_or_email(
                &self,
                provider: Provider,
                provider_id: &str,
                email: &str,
        ) -> Result<Option<User>, Problem> {
                let mut connection = connection(&self.pool)?;
                let email = email.trim().to_lowercase();

                let query = users::table.into_boxed();
                let query = match provider {
                        Provider::Facebook => query.filter(users::facebook_id.eq(provider_id).or(users::email.eq(email))),
                        Provider::Google => query.filter(users::google_id.eq(provider_id).or(users::email.eq(email))),
                };

                query.order_by(users::created_at.asc())
                        .first(&mut connection)
                        .optional()
                        .map_err(map_db_error)
        }

        fn next_user_id(&self) -> Result<i64, Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::sql_query("SELECT nextval('users_user_id_seq') AS value")
                        .get_result::<SequenceValue>(&mut connection)
                        .map(|sequence| sequence.value)
                        .map_err(map_db_error)
        }

        fn save(&self, user: User) -> Result<User, Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::insert_into(users::table)
                        .values(&user)
                        .on_conflict(users::id)
                        .do_update()
                        .set(&user)
                        .get_result(&mut connection)
                        .map_err(map_db_error)
        }

        fn count_search(&self, keywords: &[String]) -> Result<i64, Problem> {
                let mut connection = connection(&self.pool)?;

                searched(keywords).count().get_result(&mut connection).map_err(map_db_error)
        }

        fn search(&self, keywords: &[String], page: &Page) -> Result<Vec<User>, Problem> {
                let mut connection = connection(&self.pool)?;

                searched(keywords)
                        .order_by(users::user_id.asc())
                        .offset(page.offset())
                        .limit(page.limit)
                        .load(&mut connection)
                        .map_err(map_db_error)
        }

        fn follow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::insert_into(user_follows::table)
                        .values(&UserFollow {
                                follower_id,
                                following_id,
                                created_at: Utc::now().naive_utc(),
                        })
                        .on_conflict_do_nothing()
                        .execute(&mut connection)
                        .map(|_| ())
                        .map_err(map_db_error)
        }

        fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<(), Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::delete(
                        user_follows::table.filter(user_follows::follower_id
                                .eq(follower_id)
                                .and(user_follows::following_id.eq(following_id))),
                )
                .execute(&mut connection)
                .map(|_| ())
                .map_err(map_db_error)
        }
}
