use std::time::Duration;

use common::{RelayEvent, RelayEventType};
use serde_json::json;
use server::battle::DifficultyPreference;
use server::entity::problem::Difficulty;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::common::{TestApp, routes};

async fn next_of(rx: &mut broadcast::Receiver<RelayEvent>, ty: RelayEventType) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("Relay closed");
            if event.event_type == ty {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timed out waiting for {}", ty.as_str()))
}

mod battle_flow {
    use super::*;

    #[tokio::test]
    async fn matched_players_battle_to_a_rated_result() {
        let app = TestApp::spawn().await;
        let p1 = app.create_user("ada", 1200).await;
        let p2 = app.create_user("linus", 1210).await;
        app.create_problem(Difficulty::Easy, &[("1 2", "3"), ("5 5", "10")])
            .await;
        let mut rx1 = app.relay.subscribe_user(p1);
        let mut rx2 = app.relay.subscribe_user(p2);

        app.battles
            .join_queue(p1, DifficultyPreference::Any)
            .await
            .unwrap();
        app.battles
            .join_queue(p2, DifficultyPreference::Easy)
            .await
            .unwrap();

        let found = next_of(&mut rx1, RelayEventType::BattleFound).await;
        let battle_id: Uuid = serde_json::from_value(found.payload["battleId"].clone()).unwrap();
        next_of(&mut rx1, RelayEventType::BattleStart).await;
        next_of(&mut rx2, RelayEventType::BattleStart).await;

        let live = app.get(&routes::battle(battle_id)).await;
        assert_eq!(live.status, 200, "{}", live.text);
        assert_eq!(live.body["live"], true);
        assert_eq!(live.body["status"], "active");

        let res = app
            .post(
                &routes::battle_submit(battle_id),
                &json!({ "userId": p1, "code": "sum", "language": "python" }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["verdict"], "Accepted");
        assert_eq!(res.body["casesRun"], 2);

        let opponent = next_of(&mut rx2, RelayEventType::BattleOpponentSubmitted).await;
        assert_eq!(opponent.payload["verdict"], "Accepted");

        let res = app
            .post(
                &routes::battle_submit(battle_id),
                &json!({ "userId": p2, "code": "print:3", "language": "python" }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["verdict"], "Wrong Answer");

        let end = next_of(&mut rx1, RelayEventType::BattleEnd).await;
        assert_eq!(end.payload["winnerId"], p1);
        assert_eq!(end.payload["reason"], "accepted");
        assert_eq!(end.payload["ratingDelta"], 16);

        let stored = app.get(&routes::battle(battle_id)).await;
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body["live"], false);
        assert_eq!(stored.body["status"], "completed");
        assert_eq!(stored.body["winnerId"], p1);
        assert!(stored.body["player1"].get("code").is_none());

        assert_eq!(app.user(p1).await.rating, 1216);
        assert_eq!(app.user(p2).await.rating, 1194);
    }

    #[tokio::test]
    async fn second_submission_from_same_player_conflicts() {
        let app = TestApp::spawn().await;
        let p1 = app.create_user("grace", 1200).await;
        let p2 = app.create_user("barbara", 1200).await;
        app.create_problem(Difficulty::Easy, &[("1 2", "3")]).await;
        let mut rx1 = app.relay.subscribe_user(p1);

        app.battles
            .join_queue(p1, DifficultyPreference::Any)
            .await
            .unwrap();
        app.battles
            .join_queue(p2, DifficultyPreference::Any)
            .await
            .unwrap();
        let found = next_of(&mut rx1, RelayEventType::BattleFound).await;
        let battle_id: Uuid = serde_json::from_value(found.payload["battleId"].clone()).unwrap();
        next_of(&mut rx1, RelayEventType::BattleStart).await;

        let body = json!({ "userId": p1, "code": "crash", "language": "cpp" });
        let first = app.post(&routes::battle_submit(battle_id), &body).await;
        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(first.body["verdict"], "Runtime Error");

        let second = app.post(&routes::battle_submit(battle_id), &body).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn forfeit_ends_the_battle_for_the_opponent() {
        let app = TestApp::spawn().await;
        let p1 = app.create_user("ken", 1200).await;
        let p2 = app.create_user("dennis", 1200).await;
        app.create_problem(Difficulty::Easy, &[("1 2", "3")]).await;
        let mut rx2 = app.relay.subscribe_user(p2);

        app.battles
            .join_queue(p1, DifficultyPreference::Any)
            .await
            .unwrap();
        app.battles
            .join_queue(p2, DifficultyPreference::Any)
            .await
            .unwrap();
        let found = next_of(&mut rx2, RelayEventType::BattleFound).await;
        let battle_id: Uuid = serde_json::from_value(found.payload["battleId"].clone()).unwrap();
        next_of(&mut rx2, RelayEventType::BattleStart).await;

        app.battles.forfeit(battle_id, p1).await.unwrap();

        let end = next_of(&mut rx2, RelayEventType::BattleEnd).await;
        assert_eq!(end.payload["winnerId"], p2);
        assert_eq!(end.payload["reason"], "forfeit");
        assert_eq!(app.user(p2).await.rating, 1216);
        assert_eq!(app.user(p1).await.rating, 1184);

        let late = app
            .post(
                &routes::battle_submit(battle_id),
                &json!({ "userId": p2, "code": "sum", "language": "python" }),
            )
            .await;
        assert_eq!(late.status, 409);
    }
}

mod battle_lookup {
    use super::*;

    #[tokio::test]
    async fn unknown_battle_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::battle(Uuid::new_v4())).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn submitting_to_unknown_battle_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post(
                &routes::battle_submit(Uuid::new_v4()),
                &json!({ "userId": 1, "code": "sum", "language": "python" }),
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn malformed_battle_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::battle("not-a-uuid")).await;

        assert_eq!(res.status, 400);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn health_reports_in_process_judging() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::HEALTH).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "ok");
        assert_eq!(res.body["queueEnabled"], false);
        assert_eq!(res.body["queuedPlayers"], 0);
        assert_eq!(res.body["liveBattles"], 0);
    }
}
