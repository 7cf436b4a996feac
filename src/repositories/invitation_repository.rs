use std::collections::HashMap;

use derive_new::new;
use diesel::pg::Pg;
use diesel::prelude::*;

use crate::errors::problem::Problem;
use crate::models::{
        Expansion, Invitation, InvitationWithRelationships, Match, MatchSummary, Populated, Team, TeamSummary, User,
        UserSummary,
};
use crate::repositories::{
        connection, map_db_error, Cursor, DbPool, InvitationFilter, InvitationRepository, InvitationSort,
};
use crate::schema::{invitations, matches, teams, users};

#[derive(new, Debug, Clone)]
pub struct PgInvitationRepository {
        pool: DbPool,
}

fn filtered<'a>(user_id: i64, filter: &InvitationFilter) -> invitations::BoxedQuery<'a, Pg> {
        let mut query = invitations::table
                .filter(invitations::user_id.eq(user_id).or(invitations::guest_user_id.eq(user_id)))
                .into_boxed();

        if let Some(status) = filter.status {
                query = query.filter(invitations::status.eq(status));
        }
        if let Some(team_id) = filter.team_id {
                query = query.filter(invitations::team_id.eq(team_id));
        }
        if let Some(match_id) = filter.match_id {
                query = query.filter(invitations::match_id.eq(match_id));
        }
        if let Some(guest_user_id) = filter.guest_user_id {
                query = query.filter(invitations::guest_user_id.eq(guest_user_id));
        }

        query
}

impl PgInvitationRepository {
        fn with_relationships(
                &self,
                connection: &mut PgConnection,
                invitations: Vec<Invitation>,
                expansion: Expansion,
        ) -> Result<Vec<InvitationWithRelationships>, Problem> {
                let user_ids: Vec<i64> = invitations
                        .iter()
                        .flat_map(|invitation| match expansion {
                                Expansion::Deep => vec![invitation.user_id, invitation.guest_user_id],
                                Expansion::Shallow => vec![invitation.user_id],
                        })
                        .collect();
                let user_map: HashMap<i64, UserSummary> = users::table
                        .filter(users::id.eq_any(&user_ids))
                        .load::<User>(connection)
                        .map_err(map_db_error)?
                        .iter()
                        .map(|user| (user.id, user.summary()))
                        .collect();

                let team_ids: Vec<i64> = invitations
                        .iter()
                        .flat_map(|invitation| {
                                [
                                        invitation.team_id,
                                        invitation.guest_team_id,
                                        invitation.host_team_id,
                                        invitation.visiting_team_id,
                                ]
                        })
                        .flatten()
                        .collect();
                let team_map: HashMap<i64, TeamSummary> = teams::table
                        .filter(teams::id.eq_any(&team_ids))
                        .load::<Team>(connection)
                        .map_err(map_db_error)?
                        .iter()
                        .map(|team| (team.id, TeamSummary::from_team(team, expansion)))
                        .collect();

                let match_ids: Vec<i64> = invitations.iter().filter_map(|invitation| invitation.match_id).collect();
                let match_map: HashMap<i64, MatchSummary> = matches::table
                        .filter(matches::id.eq_any(&match_ids))
                        .load::<Match>(connection)
                        .map_err(map_db_error)?
                        .iter()
                        .map(|r#match| (r#match.id, MatchSummary::from(r#match)))
                        .collect();

                let team = |id: Option<i64>| id.and_then(|id| team_map.get(&id).cloned().map(Populated::Document));

                Ok(invitations
                        .into_iter()
                        .map(|invitation| InvitationWithRelationships {
                                user: user_map.get(&invitation.user_id).cloned().map(Populated::Document),
                                guest_user: match expansion {
                                        Expansion::Deep => user_map
                                                .get(&invitation.guest_user_id)
                                                .cloned()
                                                .map(Populated::Document),
                                        Expansion::Shallow => Some(Populated::Id(invitation.guest_user_id)),
                                },
                                team: team(invitation.team_id),
                                guest_team: team(invitation.guest_team_id),
                                host_team: team(invitation.host_team_id),
                                visiting_team: team(invitation.visiting_team_id),
                                r#match: invitation
                                        .match_id
                                        .and_then(|id| match_map.get(&id).cloned().map(Populated::Document)),
                                invitation,
                        })
                        .collect())
        }
}

impl InvitationRepository for PgInvitationRepository {
        fn count_by_party(&self, user_id: i64, filter: &InvitationFilter) -> Result<i64, Problem> {
                let mut connection = connection(&self.pool)?;

                filtered(user_id, filter).count().get_result(&mut connection).map_err(map_db_error)
        }

        fn find_by_party(
                &self,
                user_id: i64,
                filter: &InvitationFilter,
                cursor: &Cursor,
        ) -> Result<Vec<InvitationWithRelationships>, Problem> {
                let mut connection = connection(&self.pool)?;

                let query = filtered(user_id, filter);
                let query = match cursor.sort {
                        InvitationSort::CreatedAtAsc => query.order_by(invitations::created_at.asc()),
                        InvitationSort::CreatedAtDesc => query.order_by(invitations::created_at.desc()),
                        InvitationSort::ScheduledAtAsc => query.order_by(invitations::scheduled_at.asc()),
                        InvitationSort::ScheduledAtDesc => query.order_by(invitations::scheduled_at.desc()),
                };

                let invitations = query
                        .then_order_by(invitations::id.desc())
                        .offset(cursor.offset())
                        .limit(cursor.limit)
                        .load::<Invitation>(&mut connection)
                        .map_err(map_db_error)?;

                self.with_relationships(&mut connection, invitations, Expansion::Shallow)
        }

        fn find_by_id_and_party(
                &self,
                invitation_id: i64,
                user_id: i64,
                expansion: Expansion,
        ) -> Result<Option<InvitationWithRelationships>, Problem> {
                let mut connection = connection(&self.pool)?;

                let invitation = filtered(user_id, &InvitationFilter::default())
                        .filter(invitations::id.eq(invitation_id))
                        .first::<Invitation>(&mut connection)
                        .optional()
                        .map_err(map_db_error)?;

                invitation.map_or(Ok(None), |invitation| {
                        Ok(self.with_relationships(&mut connection, vec![invitation], expansion)?
                                .into_iter()
                                .next())
                })
        }

        fn find_plain_by_id_and_party(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem> {
                let mut connection = connection(&self.pool)?;

                filtered(user_id, &InvitationFilter::default())
                        .filter(invitations::id.eq(invitation_id))
                        .first(&mut connection)
                        .optional()
                        .map_err(map_db_error)
        }

        fn find_by_id_and_user_id(&self, invitation_id: i64, user_id: i64) -> Result<Option<Invitation>, Problem> {
                let mut connection = connection(&self.pool)?;

                invitations::table
                        .filter(invitations::id.eq(invitation_id).and(invitations::user_id.eq(user_id)))
                        .first(&mut connection)
                        .optional()
                        .map_err(map_db_error)
        }

        fn save(&self, invitation: Invitation) -> Result<Invitation, Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::insert_into(invitations::table)
                        .values(&invitation)
                        .on_conflict(invitations::id)
                        .do_update()
                        .set(&invitation)
                        .get_result(&mut connection)
                        .map_err(map_db_error)
        }

        fn delete(&self, invitation_id: i64) -> Result<(), Problem> {
                let mut connection = connection(&self.pool)?;

                diesel::delete(invitations::table.find(invitation_id))
                        .execute(&mut connection)
                        .map(|_| ())
                        .map_err(map_db_error)
        }
}
