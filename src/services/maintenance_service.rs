//! Daily housekeeping: retention purge and pre-generation of upcoming letter sequences.

use time::{Date, Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::ServerConfig,
    dao::{
        game_store::GameStore,
        models::LetterSequenceEntity,
        storage::{StorageError, StorageResult},
    },
    game::letters::LetterPool,
    services::calendar,
    state::SharedState,
};

/// Counts removed by one purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Purged {
    /// Games deleted.
    pub games: u64,
    /// Sequences deleted.
    pub sequences: u64,
}

/// Delete games played and sequences dated before the retention window.
pub async fn purge_expired(store: &dyn GameStore, retention_days: u32) -> StorageResult<Purged> {
    let window = Duration::days(i64::from(retention_days));
    let games = store
        .delete_games_before(calendar::now_millis() - window)
        .await?;
    let oldest_kept = calendar::normalized(calendar::today()) - window;
    let sequences = store.delete_sequences_before(oldest_kept).await?;
    if games > 0 || sequences > 0 {
        info!(games, sequences, retention_days, "purged expired records");
    }
    Ok(Purged { games, sequences })
}

/// Make sure `from` and the configured number of following days each have a sequence.
///
/// Returns how many sequences were generated; existing dates are left untouched.
pub async fn ensure_sequences(
    store: &dyn GameStore,
    config: &ServerConfig,
    from: Date,
) -> StorageResult<usize> {
    let pool = LetterPool::english();
    let mut created = 0;
    let mut date = from;
    for _ in 0..=config.sequences_ahead {
        let key = calendar::normalized(date);
        if store.find_sequence_by_date(key).await?.is_none() {
            let letters = pool.generate_sequence(config.sequence_length, &mut rand::rng());
            let now = calendar::now_millis();
            let sequence = LetterSequenceEntity {
                id: Uuid::new_v4(),
                date: key,
                letters,
                created_at: now,
                updated_at: now,
            };
            match store.insert_sequence(sequence).await {
                Ok(()) => {
                    debug!(%date, "generated letter sequence");
                    created += 1;
                }
                // Another writer got there first.
                Err(StorageError::Duplicate { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        let Some(next) = date.next_day() else { break };
        date = next;
    }
    if created > 0 {
        info!(created, "generated upcoming letter sequences");
    }
    Ok(created)
}

/// Run the sweep at most once per reference day, as soon as storage is reachable.
pub async fn run(state: SharedState) {
    let server = state.config().server.clone();
    let mut ticker = interval(server.maintenance_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut degraded = state.degraded_watcher();
    let mut last_run: Option<Date> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = degraded.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        let today = calendar::today();
        if last_run == Some(today) {
            continue;
        }
        let Ok(store) = state.require_game_store().await else {
            continue;
        };

        let purge = purge_expired(store.as_ref(), server.retention_days).await;
        let generate = ensure_sequences(store.as_ref(), &server, today).await;
        match (purge, generate) {
            (Ok(_), Ok(_)) => last_run = Some(today),
            (Err(err), _) | (_, Err(err)) => {
                warn!(error = %err, "daily maintenance failed; will retry");
            }
        }
    }
}
