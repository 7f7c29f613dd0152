use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::InteractionStore,
    error::{AppError, AppResult},
    models::{Interaction, InteractionCreate, InteractionPatch, SongId, UserId},
};

use super::profile::ProfileService;

/// Interaction writes. Each successful write drops the user's cached taste profile.
#[derive(Clone)]
pub struct InteractionService {
    interactions: Arc<dyn InteractionStore>,
    profiles: ProfileService,
}

impl InteractionService {
    pub fn new(interactions: Arc<dyn InteractionStore>, profiles: ProfileService) -> Self {
        Self {
            interactions,
            profiles,
        }
    }

    pub async fn record_play(&self, uid: UserId, sid: &SongId) -> AppResult<Interaction> {
        let interaction = self.interactions.record_play(uid, sid, Utc::now()).await?;
        self.profiles.invalidate(uid).await;
        tracing::debug!(uid = %uid, sid = %sid, plays = interaction.total_plays, "Play recorded");
        Ok(interaction)
    }

    pub async fn toggle_favourite(&self, uid: UserId, sid: &SongId) -> AppResult<Interaction> {
        let interaction = self.interactions.toggle_favourite(uid, sid).await?;
        self.profiles.invalidate(uid).await;
        Ok(interaction)
    }

    pub async fn create(&self, create: InteractionCreate) -> AppResult<Interaction> {
        create.validate()?;
        let interaction = self
            .interactions
            .create_interaction(create.into_interaction(Utc::now()))
            .await?;
        self.profiles.invalidate(interaction.uid).await;
        Ok(interaction)
    }

    pub async fn update(
        &self,
        uid: UserId,
        sid: &SongId,
        patch: InteractionPatch,
    ) -> AppResult<Interaction> {
        patch.validate()?;
        let interaction = self.interactions.update_interaction(uid, sid, &patch).await?;
        self.profiles.invalidate(uid).await;
        Ok(interaction)
    }

    pub async fn delete(&self, uid: UserId, sid: &SongId) -> AppResult<()> {
        self.interactions.delete_interaction(uid, sid).await?;
        self.profiles.invalidate(uid).await;
        Ok(())
    }

    pub async fn favourites(&self, uid: UserId) -> AppResult<Vec<Interaction>> {
        let interactions = self.interactions.interactions_for_user(uid).await?;
        Ok(interactions.into_iter().filter(|i| i.favourite).collect())
    }

    /// Interactions with a listen timestamp, most recent first
    pub async fn recent(&self, uid: UserId, limit: u32) -> AppResult<Vec<Interaction>> {
        if limit == 0 {
            return Err(AppError::InvalidInput("limit must be positive".to_string()));
        }
        let mut interactions: Vec<Interaction> = self
            .interactions
            .interactions_for_user(uid)
            .await?
            .into_iter()
            .filter(|i| i.last_listened.is_some())
            .collect();
        interactions.sort_by(|a, b| b.last_listened.cmp(&a.last_listened));
        interactions.truncate(limit as usize);
        Ok(interactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockInteractionStore;
    use chrono::Duration;
    use tokio_test::assert_ok;

    fn service(store: MockInteractionStore) -> InteractionService {
        let store: Arc<dyn InteractionStore> = Arc::new(store);
        InteractionService::new(store.clone(), ProfileService::new(store, None, 60))
    }

    #[tokio::test]
    async fn test_recent_orders_by_last_listened() {
        let uid = UserId::new();
        let now = Utc::now();
        let rows = vec![
            Interaction {
                last_listened: Some(now - Duration::hours(2)),
                ..Interaction::new(uid, SongId::from("old"))
            },
            Interaction::new(uid, SongId::from("never")),
            Interaction {
                last_listened: Some(now),
                ..Interaction::new(uid, SongId::from("new"))
            },
        ];

        let mut store = MockInteractionStore::new();
        store
            .expect_interactions_for_user()
            .returning(move |_| Ok(rows.clone()));

        let recent = assert_ok!(service(store).recent(uid, 5).await);
        let sids: Vec<&str> = recent.iter().map(|i| i.sid.as_str()).collect();
        assert_eq!(sids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_empty_patch_never_reaches_store() {
        let mut store = MockInteractionStore::new();
        store.expect_update_interaction().never();

        let result = service(store)
            .update(UserId::new(), &SongId::from("1"), InteractionPatch::default())
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_toggle_failure_propagates() {
        let mut store = MockInteractionStore::new();
        store
            .expect_toggle_favourite()
            .times(1)
            .returning(|_, _| Err(AppError::TransactionFailed("rolled back".to_string())));

        let result = service(store)
            .toggle_favourite(UserId::new(), &SongId::from("1"))
            .await;
        assert!(matches!(result, Err(AppError::TransactionFailed(_))));
    }
}
