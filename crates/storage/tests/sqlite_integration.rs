use challenge_core::AchievementId;
use challenge_core::model::{
    AnswerTally, CardId, ChallengeDifficulty, ChallengeSettingsDraft, Difficulty, HistoryEntry,
    SessionStats, StudyCard,
};
use challenge_core::time::fixed_now;
use challenge_storage::repository::{CardRepository, HistoryRepository, StorageError};
use challenge_storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_entry(correct: u32, minutes_later: i64) -> HistoryEntry {
    let stats = SessionStats::compute(
        AnswerTally {
            correct,
            incorrect: 1,
            skipped: 9 - correct,
        },
        10,
        Some(4.5),
        0,
        correct,
        20,
        90,
    )
    .unwrap();
    let settings = ChallengeSettingsDraft {
        duration_secs: 90,
        difficulty: ChallengeDifficulty::Expert,
        categories: vec!["Cardiology".into(), "Renal".into()],
        ..ChallengeSettingsDraft::default()
    }
    .clamp();
    HistoryEntry::from_session(
        &stats,
        &settings,
        vec![AchievementId::QuickThinker],
        fixed_now() + chrono::Duration::minutes(minutes_later),
    )
}

#[tokio::test]
async fn sqlite_roundtrips_card_pool() {
    let repo = connect("memdb_cards").await;

    let with_hint = StudyCard::new(
        CardId::new(2),
        "Normal resting heart rate?",
        "60-100 bpm",
        Some("Think of a minute".into()),
        "Cardiology",
        Difficulty::Easy,
    )
    .unwrap();
    let plain = StudyCard::new(CardId::new(1), "GFR unit?", "mL/min", None, "Renal", Difficulty::Hard)
        .unwrap();
    repo.upsert_card(&with_hint).await.unwrap();
    repo.upsert_card(&plain).await.unwrap();

    let cards = repo.list_cards().await.unwrap();
    assert_eq!(cards, vec![plain, with_hint]);
}

#[tokio::test]
async fn sqlite_history_is_append_only_and_newest_first() {
    let repo = connect("memdb_history").await;

    let older = build_entry(5, 0);
    let newer = build_entry(8, 5);
    repo.append_entry(&older).await.unwrap();
    repo.append_entry(&newer).await.unwrap();

    let listed = repo.list_entries(10).await.unwrap();
    assert_eq!(listed, vec![newer.clone(), older.clone()]);

    let fetched = repo.get_entry(older.id()).await.unwrap();
    assert_eq!(fetched.categories(), ["Cardiology".to_string(), "Renal".to_string()]);
    assert_eq!(fetched.difficulty(), ChallengeDifficulty::Expert);
    assert_eq!(fetched.achievements(), [AchievementId::QuickThinker]);

    let err = repo.append_entry(&older).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_list_respects_limit() {
    let repo = connect("memdb_limit").await;
    for i in 0..4 {
        repo.append_entry(&build_entry(i, i64::from(i))).await.unwrap();
    }
    let listed = repo.list_entries(2).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].correct_answers(), 3);
}
