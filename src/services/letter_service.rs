use time::Date;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::LetterSequenceEntity,
    dto::letters::{
        ActionResponse, CreateSequenceRequest, LetterSequenceDto, SequenceListResponse,
        SequenceResponse, TodayLettersResponse, UpdateSequenceRequest,
    },
    error::ServiceError,
    game::letters::{Letter, parse_letters},
    services::calendar,
    state::SharedState,
};

/// Number of sequences returned by the listing.
const LISTED_SEQUENCES: u64 = 30;

/// Letters of the current reference day.
pub async fn today_letters(state: &SharedState) -> Result<TodayLettersResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let today = calendar::today();
    let Some(sequence) = store.find_sequence_by_date(calendar::normalized(today)).await? else {
        return Err(ServiceError::NotFound(format!(
            "no letter sequence available for {today}"
        )));
    };
    Ok(TodayLettersResponse {
        success: true,
        letters: sequence.letters,
        sequence_id: sequence.id,
        reference_date: calendar::day_start(today),
    })
}

/// Latest sequences, most recent date first.
pub async fn list_sequences(state: &SharedState) -> Result<SequenceListResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let sequences = store.list_sequences(LISTED_SEQUENCES).await?;
    Ok(SequenceListResponse {
        success: true,
        sequences: sequences.into_iter().map(LetterSequenceDto::from).collect(),
    })
}

/// Fetch one sequence, 404 when unknown.
pub async fn get_sequence(state: &SharedState, id: Uuid) -> Result<SequenceResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(sequence) = store.find_sequence(id).await? else {
        return Err(ServiceError::NotFound(format!("letter sequence `{id}` not found")));
    };
    Ok(SequenceResponse {
        success: true,
        sequence: sequence.into(),
    })
}

/// Store a hand-made sequence for a reference day that has none yet.
pub async fn create_sequence(
    state: &SharedState,
    request: CreateSequenceRequest,
) -> Result<SequenceResponse, ServiceError> {
    request.validate()?;
    let date = parse_date(&request.date)?;
    let letters = parse_entries(&request.letters)?;
    let store = state.require_game_store().await?;

    let now = calendar::now_millis();
    let sequence = LetterSequenceEntity {
        id: Uuid::new_v4(),
        date: calendar::normalized(date),
        letters,
        created_at: now,
        updated_at: now,
    };
    store.insert_sequence(sequence.clone()).await?;

    info!(sequence_id = %sequence.id, %date, "letter sequence created");
    Ok(SequenceResponse {
        success: true,
        sequence: sequence.into(),
    })
}

/// Change the date and/or letters of a stored sequence.
pub async fn update_sequence(
    state: &SharedState,
    id: Uuid,
    request: UpdateSequenceRequest,
) -> Result<SequenceResponse, ServiceError> {
    request.validate()?;
    let date = request.date.as_deref().map(parse_date).transpose()?;
    let letters = request.letters.as_deref().map(parse_entries).transpose()?;
    let store = state.require_game_store().await?;

    let Some(mut sequence) = store.find_sequence(id).await? else {
        return Err(ServiceError::NotFound(format!("letter sequence `{id}` not found")));
    };
    if let Some(date) = date {
        sequence.date = calendar::normalized(date);
    }
    if let Some(letters) = letters {
        sequence.letters = letters;
    }
    sequence.updated_at = calendar::now_millis();

    if !store.update_sequence(sequence.clone()).await? {
        return Err(ServiceError::NotFound(format!("letter sequence `{id}` not found")));
    }
    info!(sequence_id = %id, "letter sequence updated");
    Ok(SequenceResponse {
        success: true,
        sequence: sequence.into(),
    })
}

/// Delete one sequence, 404 when unknown.
pub async fn delete_sequence(state: &SharedState, id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_game_store().await?;
    if !store.delete_sequence(id).await? {
        return Err(ServiceError::NotFound(format!("letter sequence `{id}` not found")));
    }
    info!(sequence_id = %id, "letter sequence deleted");
    Ok(ActionResponse::ok("Letter sequence deleted"))
}

fn parse_date(raw: &str) -> Result<Date, ServiceError> {
    calendar::parse_day(raw).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "invalid date `{raw}`: expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })
}

fn parse_entries(entries: &[String]) -> Result<Vec<Letter>, ServiceError> {
    parse_letters(&entries.concat()).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState,
    };

    use super::*;

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        state
    }

    fn create(date: &str, letters: &str) -> CreateSequenceRequest {
        CreateSequenceRequest {
            date: date.into(),
            letters: letters.chars().map(String::from).collect(),
        }
    }

    #[tokio::test]
    async fn todays_sequence_is_served_once_created() {
        let state = state().await;
        assert!(matches!(
            today_letters(&state).await,
            Err(ServiceError::NotFound(_))
        ));

        let today = calendar::today().to_string();
        let created = create_sequence(&state, create(&today, &"quartz".repeat(6)))
            .await
            .unwrap();
        let served = today_letters(&state).await.unwrap();
        assert_eq!(served.sequence_id, created.sequence.id);
        assert_eq!(served.letters.len(), 36);
        assert_eq!(served.letters[0], Letter::from_char('Q').unwrap());
    }

    #[tokio::test]
    async fn second_sequence_for_a_date_conflicts() {
        let state = state().await;
        let letters = "E".repeat(30);
        create_sequence(&state, create("2025-07-14", &letters))
            .await
            .unwrap();
        let err = create_sequence(&state, create("2025-07-14T12:00:00-05:00", &letters))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_dates_and_counts_are_invalid_input() {
        let state = state().await;
        assert!(matches!(
            create_sequence(&state, create("14/07/2025", &"E".repeat(30))).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            create_sequence(&state, create("2025-07-14", "ABC")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn update_and_delete_round_trip() {
        let state = state().await;
        let created = create_sequence(&state, create("2025-07-14", &"E".repeat(30)))
            .await
            .unwrap()
            .sequence;

        let updated = update_sequence(
            &state,
            created.id,
            UpdateSequenceRequest {
                date: Some("2025-07-15".into()),
                letters: None,
            },
        )
        .await
        .unwrap()
        .sequence;
        assert_eq!(updated.date.date().to_string(), "2025-07-15");
        assert_eq!(updated.letters, created.letters);

        delete_sequence(&state, created.id).await.unwrap();
        assert!(matches!(
            get_sequence(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_sequence(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
