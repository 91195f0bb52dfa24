use chrono::{DateTime, Local};

use super::report::{Field, Report, Submitter};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━";

/// PURE FUNCTION: confirmation summary shown to the submitter before sending.
pub fn summary(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n📋 ЗАЯВКА НА АВАРИЙНОГО КОМИССАРА\n{}\n\n", RULE, RULE));
    out.push_str(&format!(
        "🕐 Время: {}\n\n",
        report.created_at().format("%d.%m.%Y %H:%M")
    ));
    for field in Field::ALL {
        out.push_str(&format!(
            "{} {}:\n{}\n\n",
            field.emoji(),
            field.heading(),
            report.display(field)
        ));
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

/// PURE FUNCTION: the notification text delivered to every recipient (Markdown).
pub fn format_report(
    report: &Report,
    submitter: Option<&Submitter>,
    received_at: DateTime<Local>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n🚨 *НОВАЯ ЗАЯВКА НА АВАРИЙНОГО КОМИССАРА*\n{}\n", RULE));

    if let Some(user) = submitter {
        out.push_str(&format!(
            "\n👤 *ИНФОРМАЦИЯ О ПОЛЬЗОВАТЕЛЕ:*\nИмя: {}\nUsername: @{}\nTelegram ID: `{}`\n\n",
            escape_markdown(&user.first_name),
            user.username.as_deref().map(escape_markdown).unwrap_or_else(|| "нет".to_string()),
            user.id
        ));
    }

    out.push_str(&format!(
        "\n🕐 *Дата и время:*\n{}\n\n",
        report.created_at().format("%d.%m.%Y %H:%M:%S")
    ));
    for field in Field::ALL {
        out.push_str(&format!(
            "{} *{}:*\n{}\n\n",
            field.emoji(),
            field.heading(),
            escape_markdown(report.display(field))
        ));
    }
    out.push_str(&format!(
        "{}\n⏰ Время получения: {}\n",
        RULE,
        received_at.format("%d.%m.%Y %H:%M:%S")
    ));
    out
}

/// Backslash-escapes the characters that legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
