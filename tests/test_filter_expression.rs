use chrono::{TimeZone, Utc};
use log_filter_engine::{
    BrokerEntry, ComparisonOperator, Criterion, ExpressionNode, FilterContext, IisEntry, LogEntry,
    execute_expression,
};

fn log_entry(level: &str, message: &str) -> LogEntry {
    LogEntry {
        timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        level: level.to_string(),
        component: "core".to_string(),
        message: message.to_string(),
        logger: None,
        thread: None,
    }
}

fn iis_entry(status: i64, time_taken_ms: i64, uri_stem: &str) -> IisEntry {
    IisEntry {
        timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        client_ip: "10.0.0.5".to_string(),
        method: "GET".to_string(),
        uri_stem: uri_stem.to_string(),
        uri_query: None,
        status,
        time_taken_ms,
        bytes_sent: 1024,
        user_agent: Some("Mozilla/5.0".to_string()),
    }
}

fn leaf(field: &str, operator: ComparisonOperator, value: &str) -> ExpressionNode {
    ExpressionNode::leaf(Criterion::new(field, operator, value))
}

#[test]
fn case_insensitive_level_filter_across_a_collection() {
    // Scenario: three entries, filter `Level Equals "error"`.
    let logs = vec![
        log_entry("ERROR", "first"),
        log_entry("INFO", "second"),
        log_entry("ERROR", "third"),
    ];
    let node = leaf("Level", ComparisonOperator::Equals, "error");
    let (matched, info) = execute_expression(&node, &logs, &FilterContext::new());

    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0].message, "first");
    assert_eq!(matched[1].message, "third");
    assert_eq!(info.items_matched, 2);
    assert!((info.actual_selectivity - 0.667).abs() < 0.01);
}

#[test]
fn composite_and_over_level_and_message() {
    let node = ExpressionNode::and(vec![
        leaf("Level", ComparisonOperator::Equals, "ERROR"),
        leaf("Message", ComparisonOperator::Contains, "timeout"),
    ]);

    assert!(node.matches(&log_entry("ERROR", "Connection timeout")));
    assert!(!node.matches(&log_entry("ERROR", "OK")));
    assert!(!node.matches(&log_entry("INFO", "Connection timeout")));
}

#[test]
fn between_on_numeric_field_is_inclusive() {
    let node = ExpressionNode::leaf(Criterion::between("TimeTakenMs", "100", "200"));

    assert!(!node.matches(&iis_entry(200, 250, "/api")));
    assert!(node.matches(&iis_entry(200, 150, "/api")));
    assert!(node.matches(&iis_entry(200, 200, "/api")));
    assert!(node.matches(&iis_entry(200, 100, "/api")));
}

#[test]
fn de_morgan_consistency() {
    let a = || leaf("Level", ComparisonOperator::Equals, "ERROR");
    let b = || leaf("Message", ComparisonOperator::Contains, "timeout");

    let not_and = ExpressionNode::not(ExpressionNode::and(vec![a(), b()]));
    let or_nots = ExpressionNode::or(vec![
        ExpressionNode::not(a()),
        ExpressionNode::not(b()),
    ]);

    for entry in [
        log_entry("ERROR", "Connection timeout"),
        log_entry("ERROR", "all good"),
        log_entry("WARN", "read timeout"),
        log_entry("INFO", "all good"),
    ] {
        assert_eq!(not_and.matches(&entry), or_nots.matches(&entry));
    }
}

#[test]
fn nested_or_inside_and() {
    let node = ExpressionNode::and(vec![
        leaf("Method", ComparisonOperator::Equals, "GET"),
        ExpressionNode::or(vec![
            leaf("Status", ComparisonOperator::GreaterThanOrEqual, "500"),
            leaf("TimeTakenMs", ComparisonOperator::GreaterThan, "1000"),
        ]),
    ]);

    assert!(node.matches(&iis_entry(503, 20, "/api")));
    assert!(node.matches(&iis_entry(200, 1500, "/api")));
    assert!(!node.matches(&iis_entry(200, 20, "/api")));
}

#[test]
fn filters_apply_across_entry_schemas() {
    // The same expression shape works on broker entries through their own
    // field table.
    let broker = BrokerEntry {
        timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        queue: "orders".to_string(),
        message_id: "m-123".to_string(),
        level: "WARN".to_string(),
        message: "redelivery scheduled".to_string(),
        payload_size: 2048,
        consumer: None,
    };

    let node = ExpressionNode::and(vec![
        leaf("Queue", ComparisonOperator::StartsWith, "ord"),
        leaf("PayloadSize", ComparisonOperator::GreaterThan, "1024"),
        leaf("Consumer", ComparisonOperator::NotEquals, "billing"),
    ]);
    assert!(node.matches(&broker));

    let unknown_field = leaf("UriStem", ComparisonOperator::Equals, "/api");
    assert!(!unknown_field.matches(&broker));
}

#[test]
fn regex_against_uri() {
    let node = leaf("UriStem", ComparisonOperator::Regex, r"^/api/v\d+/users");
    assert!(node.matches(&iis_entry(200, 10, "/API/v2/users/42")));
    assert!(!node.matches(&iis_entry(200, 10, "/static/app.js")));
}
