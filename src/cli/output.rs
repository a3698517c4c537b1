//! Terminal rendering.

use chrono::{DateTime, TimeZone, Utc};
use lexchat_core::{ChatMessage, Role, SessionRecord};
use lexchat_workflow::SendOutcome;
use serde::Serialize;
use telemetry::{ComponentState, HealthReport, MetricsSnapshot};

/// Everything `lexchat status` reports.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub email: Option<String>,
    pub session: SessionRecord,
    pub message_limit: u32,
    pub remaining: u32,
    pub resets_at: Option<DateTime<Utc>>,
    pub persistent: bool,
    pub health: HealthReport,
    pub metrics: MetricsSnapshot,
}

pub fn print_outcome(outcome: &SendOutcome) {
    // The limit callback has already told the user what to do
    let Some(delivery) = outcome.delivery() else {
        return;
    };

    if delivery.chat_transferred {
        println!("(conversation moved to chat {})", delivery.chat_id);
    } else if delivery.new_chat {
        println!("(new chat {})", delivery.chat_id);
    }

    println!();
    println!("{}", delivery.reply.answer.trim());

    if !delivery.reply.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in delivery.reply.sources.iter().enumerate() {
            println!("  [{}] {}", i + 1, source.url);
        }
    }
    println!();
}

pub fn print_message(message: &ChatMessage) {
    let who = match message.role {
        Role::Human => "You",
        Role::Assistant => "Assistant",
    };
    println!("{} ({}):", who, message.created_at);
    println!("{}", message.content.trim());
    for attachment in &message.attachments {
        println!("  [attachment] {}", attachment.file_name);
    }
    for source in &message.sources {
        println!("  [source] {}", source.url);
    }
    println!();
}

pub fn print_status(report: &StatusReport) {
    match &report.email {
        Some(email) => println!("Account:    {}", email),
        None => println!("Account:    anonymous"),
    }
    println!("Session:    {}", report.session.session_id);

    if report.email.is_none() {
        println!(
            "Messages:   {}/{} used, {} remaining{}",
            report.session.message_count.min(report.message_limit),
            report.message_limit,
            report.remaining,
            if report.session.is_limit_reached {
                " (limit reached)"
            } else {
                ""
            }
        );
        if let Some(at) = report.session.last_message_at() {
            println!("Last sent:  {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
        if let Some(at) = report.resets_at {
            println!("Resets at:  {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
    }

    println!(
        "Storage:    {}",
        if report.persistent {
            "persistent"
        } else {
            "memory only"
        }
    );

    println!("Health:     {:?}", report.health.status);
    for component in &report.health.components {
        match &component.state {
            ComponentState::Up => println!("  {:<8} ok", component.name),
            ComponentState::Unknown => println!("  {:<8} not checked", component.name),
            ComponentState::Down(reason) => println!("  {:<8} {}", component.name, reason),
        }
    }

    if report.metrics.messages_sent + report.metrics.messages_blocked > 0 {
        println!(
            "This run:   {} sent, {} blocked, {} failed, latency {:.0} ms mean / {} ms max",
            report.metrics.messages_sent,
            report.metrics.messages_blocked,
            report.metrics.send_failures,
            report.metrics.send_latency_mean_ms,
            report.metrics.send_latency_max_ms
        );
    }
}

pub fn millis_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
