//! Monitoring AST.

use super::common::{Spanned, TimeAmount, TimeUnit};
use crate::lexer::Span;
use serde::{Deserialize, Serialize};

/// Root of a parsed `monitor.dsl` file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorAst {
    pub tracks: Vec<TrackDefinition>,
    pub alerts: Vec<AlertDefinition>,
    pub monitor: Option<MonitorConfig>,
    pub dashboard: Option<DashboardDefinition>,
}

/// `Track [for <Model>]:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub model_name: Option<String>,
    pub metrics: Vec<TrackedMetric>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedMetric {
    pub metric: String,
    /// Trailing `for <target>` qualifier.
    pub target: Option<String>,
    pub span: Span,
}

/// One line of the `Alerts:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefinition {
    pub severity: Severity,
    pub condition: AlertCondition,
    pub sustained_for: Option<TimeAmount>,
    pub notify: Notification,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    #[default]
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub metric: String,
    pub comparator: Comparator,
    pub threshold: Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    Above,
    Below,
    AtLeast,
    AtMost,
    Equals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub unit: ThresholdUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThresholdUnit {
    Percent,
    Milliseconds,
    Seconds,
    Requests { per: Option<TimeUnit> },
    Unitless,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub channel: Option<NotificationChannel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Email,
    Slack,
    Sms,
    Webhook,
    PagerDuty,
}

impl NotificationChannel {
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "email" => Some(NotificationChannel::Email),
            "slack" => Some(NotificationChannel::Slack),
            "sms" => Some(NotificationChannel::Sms),
            "webhook" => Some(NotificationChannel::Webhook),
            "pagerduty" => Some(NotificationChannel::PagerDuty),
            _ => None,
        }
    }
}

/// The singleton `Monitor:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub settings: Vec<Spanned<MonitorSetting>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorSetting {
    CheckInterval { every: TimeAmount },
    Retention { period: TimeAmount },
    SampleRate { percent: f64 },
    Environments { names: Vec<String> },
}

/// The singleton `Dashboard ["title"]:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardDefinition {
    pub title: Option<String>,
    pub items: Vec<Spanned<DashboardItem>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardItem {
    Show {
        metrics: Vec<String>,
        chart: Option<ChartKind>,
    },
    Refresh {
        every: TimeAmount,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartKind {
    Line,
    Bar,
    Gauge,
    Table,
}
