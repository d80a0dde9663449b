//! Scoring and leaderboard projections end to end.

mod support;

use augur::application::Leaderboard;
use augur::domain::forecast::ForecastType;
use augur::domain::leaderboard::{LeaderboardFilter, LeaderboardKind, UNCATEGORIZED};
use augur::domain::prediction::{PredictionDetails, PredictionInput};
use augur::error::Error;

use support::fixtures::{in_days, World};

fn predict(forecast: &str, group: Option<&str>, value: &str) -> PredictionInput {
    PredictionInput {
        forecast_id: forecast.to_string(),
        group_id: group.map(str::to_string),
        value: value.to_string(),
        details: PredictionDetails {
            confidence: Some(70),
            ..PredictionDetails::default()
        },
    }
}

struct Scenario {
    world: World,
    admin: augur::domain::context::RequestContext,
}

/// Two scored binary forecasts: Alice is right twice, Bob wrong once, and
/// the Research group right once.
async fn scenario() -> Scenario {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    let alice = world.member(&org.id, "Alice").await;
    let bob = world.member(&org.id, "Bob").await;
    let carol = world.member(&org.id, "Carol").await;
    let dan = world.member(&org.id, "Dan").await;
    let research = world.group(&admin, "Research").await;
    world.join(&admin, &research, &carol).await;
    world.join(&admin, &research, &dan).await;

    let first = world
        .forecast(&org.id, "First question", ForecastType::Binary, in_days(2))
        .await;
    let second = world
        .forecast(&org.id, "Second question", ForecastType::Binary, in_days(3))
        .await;

    let predictions = &world.services.predictions;
    for (ctx, input) in [
        (&alice, predict(first.id.as_str(), None, "true")),
        (&alice, predict(second.id.as_str(), None, "true")),
        (&bob, predict(first.id.as_str(), None, "false")),
        (
            &carol,
            predict(first.id.as_str(), Some(research.id.as_str()), "true"),
        ),
    ] {
        predictions.submit(ctx, input).await.unwrap();
    }

    for forecast in [&first, &second] {
        world
            .services
            .forecasts
            .record_actual(&admin, &forecast.id, "true")
            .await
            .unwrap();
    }
    Scenario { world, admin }
}

async fn board(scenario: &Scenario, kind: LeaderboardKind, filter: LeaderboardFilter) -> Leaderboard {
    scenario
        .world
        .services
        .leaderboards
        .query(&scenario.admin, kind, &filter)
        .await
        .unwrap()
}

#[tokio::test]
async fn user_board_ranks_individual_predictions_only() {
    let scenario = scenario().await;
    let Leaderboard::Users(entries) =
        board(&scenario, LeaderboardKind::Users, LeaderboardFilter::default()).await
    else {
        panic!("expected a user leaderboard");
    };

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].user_name, "Alice");
    assert_eq!(entries[0].rank, 1);
    assert_eq!(entries[0].stats.correct_predictions, 2);
    assert_eq!(entries[0].stats.total_completed_predictions, 2);
    assert_eq!(entries[1].user_name, "Bob");
    assert_eq!(entries[1].stats.incorrect_predictions, 1);
    assert!(entries.iter().all(|e| e.user_name != "Carol"));
}

#[tokio::test]
async fn minimum_forecast_cutoff_drops_thin_records() {
    let scenario = scenario().await;
    let filter = LeaderboardFilter {
        min_forecasts: Some(2),
        ..LeaderboardFilter::default()
    };
    let Leaderboard::Users(entries) = board(&scenario, LeaderboardKind::Users, filter).await
    else {
        panic!("expected a user leaderboard");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_name, "Alice");
}

#[tokio::test]
async fn recent_cutoff_keeps_latest_completed_forecasts() {
    let scenario = scenario().await;
    let filter = LeaderboardFilter {
        recent_count: Some(1),
        ..LeaderboardFilter::default()
    };
    let Leaderboard::Users(entries) = board(&scenario, LeaderboardKind::Users, filter).await
    else {
        panic!("expected a user leaderboard");
    };
    // Only the later-due forecast is in scope and Bob never predicted on it.
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].stats.total_predictions, 1);
}

#[tokio::test]
async fn group_board_counts_group_predictions() {
    let scenario = scenario().await;
    let Leaderboard::Groups(entries) =
        board(&scenario, LeaderboardKind::Groups, LeaderboardFilter::default()).await
    else {
        panic!("expected a group leaderboard");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].group_name, "Research");
    assert_eq!(entries[0].member_count, 2);
    assert_eq!(entries[0].stats.correct_predictions, 1);
}

#[tokio::test]
async fn category_board_groups_uncategorized_forecasts() {
    let scenario = scenario().await;
    let Leaderboard::Categories(entries) =
        board(&scenario, LeaderboardKind::Categories, LeaderboardFilter::default()).await
    else {
        panic!("expected a category leaderboard");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category_name, UNCATEGORIZED);
    assert_eq!(entries[0].total_forecasts, 2);
    assert_eq!(entries[0].completed_forecasts, 2);
}

#[tokio::test]
async fn recording_actuals_requires_an_admin_and_a_valid_value() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    let alice = world.member(&org.id, "Alice").await;
    let forecast = world
        .forecast(&org.id, "Will it ship?", ForecastType::Binary, in_days(1))
        .await;

    let result = world
        .services
        .forecasts
        .record_actual(&alice, &forecast.id, "true")
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    let result = world
        .services
        .forecasts
        .record_actual(&admin, &forecast.id, "perhaps")
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    let recorded = world
        .services
        .forecasts
        .record_actual(&admin, &forecast.id, "false")
        .await
        .unwrap();
    assert_eq!(recorded.actual_value.as_deref(), Some("false"));
}
