/// Basic integration tests over on-disk databases and the MCP surface
use hydration_tracker::mcp::McpServer;
use hydration_tracker::*;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> HydrationTrackerServer {
    HydrationTrackerServer::new(dir.path().join("hydration.db"), dir.path().join("flags.db"))
        .await
        .expect("Failed to create server")
}

async fn call_tool(server: &mut McpServer, id: u64, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let response = server
        .handle_line(&request.to_string())
        .await
        .expect("requests with an id get a response");
    serde_json::to_value(response).unwrap()
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap_or_default()
}

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let server = open(&dir).await;
            server.store().save_daily_goal(DailyGoal::new(2400).unwrap());
            server.store().log_intake(500, EntrySource::Manual).unwrap();
            server.flags().set_flag(CriticalFlag::OnboardingCompleted, true).await.unwrap();
        }

        let server = open(&dir).await;
        server.start().await.unwrap();
        assert_eq!(server.store().load_daily_goal().ml(), 2400);
        assert_eq!(server.store().load_history().len(), 1);
        assert!(server.flags().is_initialized());
        assert!(server.flags().get_flag(CriticalFlag::OnboardingCompleted).await);
    }

    #[tokio::test]
    async fn test_backup_moves_between_installs() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();

        let source = open(&source_dir).await;
        source.store().save_daily_goal(DailyGoal::new(1800).unwrap());
        source.store().log_intake(300, EntrySource::Manual).unwrap();
        source.store().log_intake(450, EntrySource::Reminder).unwrap();
        source.flags().set_flag(CriticalFlag::GoalSetupCompleted, true).await.unwrap();
        let document = backup::create_backup(source.store(), source.flags()).await.unwrap();

        let target = open(&target_dir).await;
        target.store().update_history_day(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 900, 2000).unwrap();
        let summary = backup::restore_backup(target.store(), target.flags(), &document).await.unwrap();
        assert_eq!(summary.entries, 2);

        assert_eq!(target.store().load_daily_goal().ml(), 1800);
        assert_eq!(target.store().load_history(), source.store().load_history());
        assert_eq!(target.store().entry_dates(), source.store().entry_dates());
        assert!(target.flags().get_flag(CriticalFlag::GoalSetupCompleted).await);
    }

    #[tokio::test]
    async fn test_rejected_backup_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let server = open(&dir).await;
        server.store().log_intake(250, EntrySource::Manual).unwrap();
        let before = server.store().load_history();

        let bad = r#"{"version": 1, "dailyGoal": 0, "entries": {}, "history": []}"#;
        let result = backup::restore_backup(server.store(), server.flags(), bad).await;
        assert!(matches!(result, Err(BackupError::InvalidContent(_))));
        assert_eq!(server.store().load_history(), before);
    }

    #[tokio::test]
    async fn test_tool_workflow() {
        let dir = TempDir::new().unwrap();
        let mut server = McpServer::new(open(&dir).await);

        let goal = call_tool(&mut server, 1, "goal_set", json!({"goal_ml": 1000})).await;
        assert!(text(&goal).contains("1000 ml"));

        call_tool(&mut server, 2, "hydration_log", json!({"amount_ml": 600})).await;
        call_tool(&mut server, 3, "hydration_log", json!({"amount_ml": 400})).await;
        let today = call_tool(&mut server, 4, "hydration_today", json!({})).await;
        assert!(text(&today).contains("1000 / 1000 ml (100%)"));

        let undo = call_tool(&mut server, 5, "hydration_undo", json!({})).await;
        assert!(text(&undo).contains("Undid 400 ml"));

        let stats = call_tool(&mut server, 6, "stats_get", json!({})).await;
        assert!(text(&stats).contains("Days tracked: 1"));
        assert!(text(&stats).contains("First Sip"));

        let flag = call_tool(&mut server, 7, "flag_set", json!({"flag": "profile_completed", "value": true})).await;
        assert_eq!(flag["result"]["isError"], json!(false));

        let unknown = call_tool(&mut server, 8, "habit_create", json!({})).await;
        assert_eq!(unknown["result"]["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_reminder_tools_follow_settings() {
        let dir = TempDir::new().unwrap();
        let mut server = McpServer::new(open(&dir).await);

        let first = call_tool(&mut server, 1, "reminders_schedule", json!({})).await;
        assert!(text(&first).contains("Scheduled"));
        let again = call_tool(&mut server, 2, "reminders_schedule", json!({})).await;
        assert!(text(&again).contains("already pending"));

        call_tool(
            &mut server,
            3,
            "settings_update",
            json!({"user_settings": {"notificationsEnabled": false}}),
        )
        .await;
        assert!(server.tracker().dispatcher().snapshot().is_empty());
    }
}
