//! Monitoring (`monitor.dsl`) parser.

use super::cursor::{time_unit_of, TokenCursor};
use super::GrammarParser;
use crate::ast::*;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::lexer::{unquote, Position, TokenKind};

pub struct MonitorParser {
    cursor: TokenCursor,
}

impl GrammarParser for MonitorParser {
    type Output = MonitorAst;
    const GRAMMAR: Grammar = Grammar::Monitor;

    fn from_cursor(cursor: TokenCursor) -> Self {
        Self { cursor }
    }

    fn parse(mut self) -> Result<MonitorAst, ParseError> {
        let mut ast = MonitorAst::default();
        loop {
            self.cursor.skip_newlines();
            if self.cursor.at_end() {
                break;
            }
            let start = self.cursor.start();
            match self.cursor.kind() {
                TokenKind::Track => ast.tracks.push(self.parse_track(start)?),
                TokenKind::Alerts => {
                    let alerts = self.parse_alerts()?;
                    ast.alerts.extend(alerts);
                }
                TokenKind::Monitor => {
                    if ast.monitor.is_some() {
                        return Err(self.cursor.error_at("Duplicate Monitor section", start));
                    }
                    ast.monitor = Some(self.parse_monitor(start)?);
                }
                TokenKind::Dashboard => {
                    if ast.dashboard.is_some() {
                        return Err(self.cursor.error_at("Duplicate Dashboard section", start));
                    }
                    ast.dashboard = Some(self.parse_dashboard(start)?);
                }
                _ => {
                    return Err(self
                        .cursor
                        .error("Expected monitoring section (Track, Alerts, Monitor or Dashboard)"))
                }
            }
        }
        Ok(ast)
    }
}

impl MonitorParser {
    // ========================================================================
    // Track
    // ========================================================================

    fn parse_track(&mut self, start: Position) -> Result<TrackDefinition, ParseError> {
        self.cursor.advance();
        let model_name = if self.cursor.eat(TokenKind::For) {
            Some(self.cursor.model_reference(&[TokenKind::Colon])?)
        } else {
            None
        };
        self.cursor.expect_header_end("after 'Track'")?;
        let section = match &model_name {
            Some(model) => format!("Track for {}", model),
            None => "Track".to_string(),
        };

        let mut metrics = Vec::new();
        while let Some(item_start) = self.cursor.next_item(metrics.len(), &section)? {
            let metric = self.cursor.name(&[TokenKind::For], "metric name")?;
            let target = if self.cursor.eat(TokenKind::For) {
                Some(self.cursor.name(&[], "metric target")?.text)
            } else {
                None
            };
            metrics.push(TrackedMetric {
                metric: metric.text,
                target,
                span: self.cursor.span_from(item_start),
            });
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&metrics, &section)?;

        tracing::trace!(section = %section, metrics = metrics.len(), "parsed track section");
        Ok(TrackDefinition {
            model_name,
            metrics,
            span: self.cursor.span_from(start),
        })
    }

    // ========================================================================
    // Alerts
    // ========================================================================

    fn parse_alerts(&mut self) -> Result<Vec<AlertDefinition>, ParseError> {
        self.cursor.advance();
        self.cursor.expect_header_end("after 'Alerts'")?;

        let mut alerts = Vec::new();
        while let Some(item_start) = self.cursor.next_item(alerts.len(), "Alerts")? {
            alerts.push(self.parse_alert(item_start)?);
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&alerts, "Alerts")?;
        tracing::trace!(alerts = alerts.len(), "parsed alerts section");
        Ok(alerts)
    }

    /// `[severity] when <metric> <comparator> <threshold> [for N <unit>]
    /// notify <recipient> [via <channel>]`
    fn parse_alert(&mut self, start: Position) -> Result<AlertDefinition, ParseError> {
        let severity = match self.cursor.kind() {
            TokenKind::Critical => Some(Severity::Critical),
            TokenKind::Warning => Some(Severity::Warning),
            TokenKind::Info => Some(Severity::Info),
            _ => None,
        };
        if severity.is_some() {
            self.cursor.advance();
        }
        self.cursor.expect(TokenKind::When, "to start alert condition")?;

        let metric = self.cursor.name(
            &[TokenKind::Is, TokenKind::Exceeds, TokenKind::Equals],
            "metric name",
        )?;
        let comparator = self.parse_comparator()?;
        let threshold = self.parse_threshold()?;

        let sustained_for = if self.cursor.eat(TokenKind::For) {
            Some(self.cursor.time_amount("duration")?)
        } else {
            None
        };

        self.cursor.expect(TokenKind::Notify, "after alert condition")?;
        let recipient = self.cursor.name(&[TokenKind::Via], "recipient")?;
        let channel = if self.cursor.eat(TokenKind::Via) {
            let token = self.cursor.current().clone();
            let channel = token
                .is_word()
                .then(|| NotificationChannel::from_word(&token.text))
                .flatten()
                .ok_or_else(|| {
                    self.cursor.error(
                        "Expected notification channel (email, slack, sms, webhook or pagerduty)",
                    )
                })?;
            self.cursor.advance();
            Some(channel)
        } else {
            None
        };

        Ok(AlertDefinition {
            severity: severity.unwrap_or_default(),
            condition: AlertCondition {
                metric: metric.text,
                comparator,
                threshold,
            },
            sustained_for,
            notify: Notification {
                recipient: recipient.text,
                channel,
            },
            span: self.cursor.span_from(start),
        })
    }

    fn parse_comparator(&mut self) -> Result<Comparator, ParseError> {
        let symbol = match self.cursor.kind() {
            TokenKind::Gt => Some(Comparator::Above),
            TokenKind::Lt => Some(Comparator::Below),
            TokenKind::Ge => Some(Comparator::AtLeast),
            TokenKind::Le => Some(Comparator::AtMost),
            TokenKind::Eq | TokenKind::Equals => Some(Comparator::Equals),
            TokenKind::Exceeds => Some(Comparator::Above),
            _ => None,
        };
        if let Some(comparator) = symbol {
            self.cursor.advance();
            return Ok(comparator);
        }

        self.cursor.expect(TokenKind::Is, "after metric name")?;
        let comparator = match self.cursor.kind() {
            TokenKind::Above => Comparator::Above,
            TokenKind::Below => Comparator::Below,
            TokenKind::Greater => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::Than, "after 'greater'")?;
                return Ok(Comparator::Above);
            }
            TokenKind::Less => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::Than, "after 'less'")?;
                return Ok(Comparator::Below);
            }
            TokenKind::At => {
                self.cursor.advance();
                if self.cursor.eat(TokenKind::Least) {
                    return Ok(Comparator::AtLeast);
                }
                self.cursor.expect(TokenKind::Most, "after 'at'")?;
                return Ok(Comparator::AtMost);
            }
            _ => {
                return Err(self.cursor.error(
                    "Expected comparison (above, below, greater than, less than, at least or at most)",
                ))
            }
        };
        self.cursor.advance();
        Ok(comparator)
    }

    fn parse_threshold(&mut self) -> Result<Threshold, ParseError> {
        let value = self.cursor.number("threshold")?;
        let unit = match self.cursor.kind() {
            TokenKind::PercentSign | TokenKind::Percent => {
                self.cursor.advance();
                ThresholdUnit::Percent
            }
            TokenKind::Millisecond => {
                self.cursor.advance();
                ThresholdUnit::Milliseconds
            }
            TokenKind::Second => {
                self.cursor.advance();
                ThresholdUnit::Seconds
            }
            TokenKind::Requests => {
                self.cursor.advance();
                let per = if self.cursor.eat(TokenKind::Per) {
                    Some(self.cursor.expect_time_unit()?)
                } else {
                    None
                };
                ThresholdUnit::Requests { per }
            }
            kind if time_unit_of(kind).is_some() => {
                return Err(self.cursor.error(
                    "Threshold durations must be given in ms or seconds",
                ))
            }
            _ => ThresholdUnit::Unitless,
        };
        Ok(Threshold { value, unit })
    }

    // ========================================================================
    // Monitor and Dashboard
    // ========================================================================

    fn parse_monitor(&mut self, start: Position) -> Result<MonitorConfig, ParseError> {
        self.cursor.advance();
        self.cursor.expect_header_end("after 'Monitor'")?;

        let mut settings = Vec::new();
        while let Some(item_start) = self.cursor.next_item(settings.len(), "Monitor")? {
            let setting = self.parse_monitor_setting()?;
            settings.push(Spanned::new(setting, self.cursor.span_from(item_start)));
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&settings, "Monitor")?;

        Ok(MonitorConfig {
            settings,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_monitor_setting(&mut self) -> Result<MonitorSetting, ParseError> {
        if self.cursor.eat_word("check") {
            self.cursor.expect(TokenKind::Interval, "after 'check'")?;
            return Ok(MonitorSetting::CheckInterval {
                every: self.cursor.time_amount("check interval")?,
            });
        }
        if self.cursor.eat(TokenKind::Retention) {
            return Ok(MonitorSetting::Retention {
                period: self.cursor.time_amount("retention period")?,
            });
        }
        if self.cursor.eat(TokenKind::Sample) {
            self.cursor.expect(TokenKind::Rate, "after 'sample'")?;
            let start = self.cursor.start();
            let percent = self.cursor.number("sample rate")?;
            if !(0.0..=100.0).contains(&percent) {
                return Err(self.cursor.error_at(
                    format!("Sample rate must be between 0 and 100, got {}", percent),
                    start,
                ));
            }
            if !self.cursor.eat(TokenKind::PercentSign) {
                self.cursor.eat(TokenKind::Percent);
            }
            return Ok(MonitorSetting::SampleRate { percent });
        }
        if self.cursor.eat_word("environments") {
            return Ok(MonitorSetting::Environments {
                names: self.cursor.name_list(&[], "environment name")?,
            });
        }
        Err(self.cursor.error(
            "Expected monitor setting (check interval, retention, sample rate or environments)",
        ))
    }

    fn parse_dashboard(&mut self, start: Position) -> Result<DashboardDefinition, ParseError> {
        self.cursor.advance();
        let title = if self.cursor.check(TokenKind::StringLiteral) {
            Some(unquote(&self.cursor.bump().text))
        } else {
            None
        };
        self.cursor.expect_header_end("after 'Dashboard'")?;

        let mut items = Vec::new();
        while let Some(item_start) = self.cursor.next_item(items.len(), "Dashboard")? {
            let item = if self.cursor.eat(TokenKind::Show) {
                let metrics = self.cursor.name_list(&[TokenKind::As], "metric name")?;
                let chart = if self.cursor.eat(TokenKind::As) {
                    Some(self.parse_chart()?)
                } else {
                    None
                };
                DashboardItem::Show { metrics, chart }
            } else if self.cursor.eat(TokenKind::Refresh) {
                self.cursor.expect(TokenKind::Every, "after 'refresh'")?;
                DashboardItem::Refresh {
                    every: self.cursor.time_amount("refresh interval")?,
                }
            } else {
                return Err(self.cursor.error("Expected 'show' or 'refresh every'"));
            };
            items.push(Spanned::new(item, self.cursor.span_from(item_start)));
            self.cursor.expect_line_end()?;
        }
        self.cursor.require_items(&items, "Dashboard")?;

        Ok(DashboardDefinition {
            title,
            items,
            span: self.cursor.span_from(start),
        })
    }

    fn parse_chart(&mut self) -> Result<ChartKind, ParseError> {
        self.cursor.eat_word("a");
        let chart = if self.cursor.eat_word("line") {
            ChartKind::Line
        } else if self.cursor.eat_word("bar") {
            ChartKind::Bar
        } else if self.cursor.eat_word("gauge") {
            ChartKind::Gauge
        } else if self.cursor.eat_word("table") {
            ChartKind::Table
        } else {
            return Err(self
                .cursor
                .error("Expected chart kind (line, bar, gauge or table)"));
        };
        self.cursor.eat_word("chart");
        Ok(chart)
    }
}

// ============================================================================
// TESTS
// ============================================================================
