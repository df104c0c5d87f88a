//! Integration tests for joining tournaments.
//!
//! Tests stake splitting across backers, the all-or-nothing debit, and the
//! conflict rules around repeated joins.

use bidder::{ErrorKind, Ledger, LedgerError};

/// Ledger with funded players and one announced tournament
async fn setup_ledger(players: &[(&str, i64)], deposit: i64) -> Ledger {
    let ledger = Ledger::in_memory();
    for (id, points) in players {
        ledger.fund(id, *points).await.unwrap();
    }
    ledger.announce_tournament(1, deposit).await.unwrap();
    ledger
}

fn backers(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn test_join_without_backers() {
    let ledger = setup_ledger(&[("P1", 1000)], 500).await;

    let receipt = ledger
        .join_tournament(1, "P1", &[])
        .await
        .expect("Join should succeed");
    assert_eq!(receipt.stake, 500);
    assert_eq!(receipt.members, 1);
    assert_eq!(receipt.unallocated, 0);

    assert_eq!(ledger.balance("P1").await.unwrap().balance, 500);
}

#[tokio::test]
async fn test_join_splits_stake_with_remainder() {
    let ledger = setup_ledger(&[("P1", 100), ("P2", 100), ("P3", 100)], 100).await;

    let receipt = ledger
        .join_tournament(1, "P1", &backers(&["P2", "P3"]))
        .await
        .unwrap();
    assert_eq!(receipt.stake, 33);
    assert_eq!(receipt.members, 3);
    assert_eq!(receipt.unallocated, 1);

    for id in ["P1", "P2", "P3"] {
        assert_eq!(ledger.balance(id).await.unwrap().balance, 67);
    }
}

#[tokio::test]
async fn test_join_records_attendance_in_group_order() {
    let ledger = setup_ledger(&[("P1", 100), ("P2", 100), ("P3", 100)], 30).await;

    ledger
        .join_tournament(1, "P1", &backers(&["P3", "P2"]))
        .await
        .unwrap();

    let attendances = ledger.attendances(1).await.unwrap();
    assert_eq!(attendances.len(), 1);

    let attendance = &attendances[0];
    assert_eq!(attendance.player_id, "P1");
    assert_eq!(attendance.backers, backers(&["P3", "P2"]));
    assert_eq!(attendance.stake, 10);
    assert_eq!(
        attendance.members().collect::<Vec<_>>(),
        vec!["P1", "P3", "P2"]
    );
}

#[tokio::test]
async fn test_join_twice_conflicts() {
    let ledger = setup_ledger(&[("P1", 1000)], 100).await;

    ledger.join_tournament(1, "P1", &[]).await.unwrap();
    let err = ledger.join_tournament(1, "P1", &[]).await.unwrap_err();

    assert!(matches!(
        err,
        LedgerError::AlreadyJoined { tournament_id: 1, ref player_id } if player_id == "P1"
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ledger.balance("P1").await.unwrap().balance, 900);
}

#[tokio::test]
async fn test_backer_may_join_as_entrant() {
    let ledger = setup_ledger(&[("P1", 1000), ("P2", 1000)], 100).await;

    ledger
        .join_tournament(1, "P1", &backers(&["P2"]))
        .await
        .unwrap();
    ledger.join_tournament(1, "P2", &[]).await.unwrap();

    assert_eq!(ledger.balance("P1").await.unwrap().balance, 950);
    assert_eq!(ledger.balance("P2").await.unwrap().balance, 850);
    assert_eq!(ledger.attendances(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_join_insufficient_funds_debits_nobody() {
    let ledger = setup_ledger(&[("P1", 1000), ("P2", 100)], 500).await;

    let err = ledger
        .join_tournament(1, "P1", &backers(&["P2"]))
        .await
        .unwrap_err();

    match err {
        LedgerError::InsufficientFunds {
            ref player_id,
            available,
            required,
        } => {
            assert_eq!(player_id, "P2");
            assert_eq!(available, 100);
            assert_eq!(required, 250);
        }
        other => panic!("Expected InsufficientFunds, got {other:?}"),
    }

    assert_eq!(ledger.balance("P1").await.unwrap().balance, 1000);
    assert_eq!(ledger.balance("P2").await.unwrap().balance, 100);
    assert!(ledger.attendances(1).await.unwrap().is_empty());

    // The failed join did not consume the slot
    ledger.fund("P2", 150).await.unwrap();
    ledger
        .join_tournament(1, "P1", &backers(&["P2"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_join_with_missing_players() {
    let ledger = setup_ledger(&[("P1", 1000)], 100).await;

    let err = ledger
        .join_tournament(1, "P1", &backers(&["ghost", "P1b"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IncompletePlayers(ref missing) if *missing == backers(&["ghost", "P1b"])
    ));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(ledger.balance("P1").await.unwrap().balance, 1000);

    let err = ledger.join_tournament(1, "nobody", &[]).await.unwrap_err();
    assert!(matches!(err, LedgerError::IncompletePlayers(_)));
}

#[tokio::test]
async fn test_join_unknown_tournament() {
    let ledger = setup_ledger(&[("P1", 1000)], 100).await;

    let err = ledger.join_tournament(9, "P1", &[]).await.unwrap_err();
    assert!(matches!(err, LedgerError::TournamentNotFound(9)));
    assert_eq!(ledger.balance("P1").await.unwrap().balance, 1000);
}

#[tokio::test]
async fn test_join_group_validation() {
    let ledger = setup_ledger(&[("P1", 1000), ("P2", 1000)], 100).await;

    assert!(matches!(
        ledger.join_tournament(1, "", &[]).await,
        Err(LedgerError::InvalidPlayerId)
    ));
    assert!(matches!(
        ledger.join_tournament(1, "P1", &backers(&["P1"])).await,
        Err(LedgerError::DuplicateGroupMember(ref id)) if id == "P1"
    ));
    assert!(matches!(
        ledger.join_tournament(1, "P1", &backers(&["P2", "P2"])).await,
        Err(LedgerError::DuplicateGroupMember(ref id)) if id == "P2"
    ));
    assert!(matches!(
        ledger.join_tournament(1, "P1", &backers(&[""])).await,
        Err(LedgerError::InvalidPlayerId)
    ));
    assert!(matches!(
        ledger.join_tournament(0, "P1", &[]).await,
        Err(LedgerError::InvalidTournamentId(0))
    ));

    assert_eq!(ledger.balance("P1").await.unwrap().balance, 1000);
}

#[tokio::test]
async fn test_list_attendances_unknown_tournament() {
    let ledger = Ledger::in_memory();

    assert!(matches!(
        ledger.attendances(5).await,
        Err(LedgerError::TournamentNotFound(5))
    ));
}

#[tokio::test]
async fn test_list_attendances_rejects_non_positive_id() {
    let ledger = Ledger::in_memory();

    for id in [0, -3] {
        let err = ledger.attendances(id).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTournamentId(bad) if bad == id));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
