use std::sync::Arc;

use chrono::Local;
use tracing::info;

use super::event::{Keyboard, Reply};
use super::extractor;
use super::format;
use super::history::Turn;
use super::notifier::Notifier;
use super::registry::{AddOutcome, RecipientRegistry, RemoveOutcome};
use super::report::{Field, Submitter};
use super::state::{Session, SessionState, StateDelta};
use super::UserId;
use crate::services::llm::AssistantAdapter;

pub const MODE_ASSISTANT: &str = "🤖 Общаться с AI-помощником";
pub const MODE_STEPS: &str = "📋 Заполнить по шагам";
pub const MODE_ADMIN: &str = "⚙️ Управление администраторами";

pub const PARTICIPANTS_TWO: &str = extractor::TWO_VEHICLES;
pub const PARTICIPANTS_THREE: &str = extractor::THREE_VEHICLES;
pub const PARTICIPANTS_MORE: &str = "Более 3 автомобилей";
pub const INJURIES_NONE: &str = extractor::NO_INJURIES;
pub const INJURIES_SOME: &str = extractor::INJURIES_PRESENT;

pub const CONFIRM_SEND: &str = "✅ Подтвердить и отправить";
pub const CONFIRM_CANCEL: &str = "❌ Отменить";

pub const ADMIN_ADD: &str = "➕ Добавить администратора";
pub const ADMIN_REMOVE: &str = "➖ Удалить администратора";
pub const ADMIN_LIST: &str = "📋 Список администраторов";
pub const ADMIN_BACK: &str = "◀️ Вернуться назад";

const FINISH_WORDS: &[&str] = &["/finish", "завершить", "закончить", "готово"];

const FINISH_HINT: &str = "💡 Когда закончите, напишите /finish";
const BAD_ID: &str = "❌ Неверный формат ID. Введите числовой ID.\nДля отмены отправьте /cancel";
pub const LAST_RECIPIENT: &str = "❌ Нельзя удалить последнего администратора (себя)!";

/// The conversation state machine.
///
/// Owns no per-user state: every transition receives the `Session` it acts
/// on and returns the prompts to send back to that user.
#[derive(Clone)]
pub struct Controller {
    registry: Arc<RecipientRegistry>,
    assistant: AssistantAdapter,
    notifier: Notifier,
}

impl Controller {
    pub fn new(registry: Arc<RecipientRegistry>, assistant: AssistantAdapter, notifier: Notifier) -> Self {
        Self { registry, assistant, notifier }
    }

    /// Idle -> ChoosingMode. Fresh report and history.
    pub async fn start(&self, user: &Submitter) -> (Session, Vec<Reply>) {
        info!(user_id = user.id, "{} started a session", user.first_name);
        let session = Session::new();

        let keyboard = if self.registry.is_recipient(user.id).await {
            Keyboard::rows([&[MODE_ASSISTANT], &[MODE_STEPS], &[MODE_ADMIN]])
        } else {
            Keyboard::rows([&[MODE_ASSISTANT], &[MODE_STEPS]])
        };
        let greeting = Reply::text(format!(
            "Здравствуйте, {}! 👋\n\n\
             Я помогу оформить заявку для аварийного комиссара после ДТП.\n\n\
             Выберите удобный способ:",
            user.first_name
        ))
        .with_keyboard(keyboard);

        (session, vec![greeting])
    }

    /// Routes one free-text message to the handler for the session's state.
    pub async fn advance(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        match session.state {
            SessionState::ChoosingMode => self.choose_mode(session, user, text).await,
            SessionState::Location
            | SessionState::Participants
            | SessionState::Damage
            | SessionState::Injuries
            | SessionState::Contact => self.step(session, text),
            SessionState::AiChat => self.ai_chat(session, text).await,
            SessionState::Confirm => self.confirm(session, user, text).await,
            SessionState::AdminMenu => self.admin_menu(session, user, text).await,
            SessionState::AdminAdd => self.admin_add(session, user, text).await,
            SessionState::AdminRemove => self.admin_remove(session, user, text).await,
            SessionState::Idle => Vec::new(),
        }
    }

    /// Finalization: AiChat -> Confirm when required fields are present.
    pub fn finish(&self, session: &mut Session) -> Vec<Reply> {
        let missing = session.report.missing_required();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.label()).collect();
            return vec![Reply::text(format!("⚠️ Пожалуйста, укажите: {}", names.join(", ")))];
        }
        session.reduce(StateDelta::Goto(SessionState::Confirm));
        vec![confirmation(session)]
    }

    pub fn cancel(&self) -> Reply {
        info!("operation cancelled by user");
        Reply::text("❌ Операция отменена.\n\nОтправьте /start для начала новой заявки.")
            .with_keyboard(Keyboard::Remove)
    }

    pub async fn help(&self, user: &Submitter) -> Reply {
        let mut text = String::from(
            "🤖 СПРАВКА ПО БОТУ\n\n\
             Команды:\n\
             /start - Начать новую заявку\n\
             /help - Показать эту справку\n\
             /cancel - Отменить текущую операцию\n\
             /myid - Узнать свой Telegram ID\n\n\
             Режимы работы:\n\
             🤖 AI-помощник - свободное общение\n\
             📋 По шагам - ответы на вопросы\n\n\
             В AI-режиме используйте /finish для завершения.",
        );
        if self.registry.is_recipient(user.id).await {
            text.push_str("\n\n⚙️ Админ-команды:\n/start → Управление администраторами");
        }
        Reply::text(text)
    }

    pub async fn my_id(&self, user: &Submitter) -> Reply {
        let status = if self.registry.is_recipient(user.id).await {
            "👑 Администратор"
        } else {
            "👤 Пользователь"
        };
        Reply::text(format!(
            "ℹ️ Ваша информация:\n\nИмя: {}\nUsername: @{}\nTelegram ID: `{}`\nСтатус: {}",
            format::escape_markdown(&user.first_name),
            user.username.as_deref().map(format::escape_markdown).unwrap_or_else(|| "не установлен".to_string()),
            user.id,
            status
        ))
        .markdown()
    }

    // ==================== Mode choice ====================

    async fn choose_mode(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        info!(session_id = %session.id, "mode chosen: {}", text);

        if text.contains('⚙') && self.registry.is_recipient(user.id).await {
            return self.enter_admin_menu(session, user).await;
        }

        if text.contains('🤖') || text.to_uppercase().contains("AI") {
            session.reduce(StateDelta::Goto(SessionState::AiChat));
            return vec![Reply::text(
                "🤖 Отлично! Теперь общайтесь со мной свободно.\n\nРасскажите, что произошло и где?",
            )
            .with_keyboard(Keyboard::Remove)];
        }

        session.reduce(StateDelta::Goto(SessionState::Location));
        vec![Reply::text(
            "📋 Буду задавать вопросы по порядку.\n\n\
             📍 Шаг 1/5: Где произошло ДТП?\n\
             Укажите адрес или ориентиры:",
        )
        .with_keyboard(Keyboard::Remove)]
    }

    // ==================== Step mode ====================

    fn step(&self, session: &mut Session, text: &str) -> Vec<Reply> {
        let (Some(field), Some(next)) = (session.state.step_field(), session.state.next_step()) else {
            return Vec::new();
        };

        // Verbatim, no extraction in step mode
        info!(session_id = %session.id, "{} {}: {}", field.emoji(), field.heading(), text);
        session.reduce(StateDelta::Write { field, value: text.to_string() });
        session.reduce(StateDelta::Goto(next));

        let reply = match next {
            SessionState::Participants => Reply::text(
                "✅ Место ДТП сохранено.\n\n👥 Шаг 2/5: Сколько автомобилей участвовало?",
            )
            .with_keyboard(Keyboard::rows([
                &[PARTICIPANTS_TWO, PARTICIPANTS_THREE],
                &[PARTICIPANTS_MORE],
            ])),
            SessionState::Damage => Reply::text(
                "✅ Количество участников сохранено.\n\n\
                 🚗 Шаг 3/5: Опишите повреждения вашего автомобиля:\n\
                 (например: разбита фара, помят бампер)",
            )
            .with_keyboard(Keyboard::Remove),
            SessionState::Injuries => Reply::text(
                "✅ Повреждения зафиксированы.\n\n🚑 Шаг 4/5: Есть ли пострадавшие?",
            )
            .with_keyboard(Keyboard::rows([&[INJURIES_NONE], &[INJURIES_SOME]])),
            SessionState::Contact => Reply::text(
                "✅ Информация сохранена.\n\n\
                 📞 Шаг 5/5: Укажите ваш контактный телефон:\n\
                 (например: +79001234567)",
            )
            .with_keyboard(Keyboard::Remove),
            _ => confirmation(session),
        };
        vec![reply]
    }

    // ==================== Assistant mode ====================

    async fn ai_chat(&self, session: &mut Session, text: &str) -> Vec<Reply> {
        info!(session_id = %session.id, "assistant chat: {}", text);

        if is_finish_word(text) {
            return self.finish(session);
        }

        let updated = extractor::extract(text, &mut session.report);
        let reply = self
            .assistant
            .reply(text, session.history.window(), &session.report)
            .await;

        session.reduce(StateDelta::Record(Turn::user(text)));
        session.reduce(StateDelta::Record(Turn::assistant(reply.clone())));

        let mut out = String::new();
        if !updated.is_empty() {
            let names: Vec<&str> = updated.iter().map(Field::label).collect();
            out.push_str(&format!("✅ Сохранено: {}\n\n", names.join(", ")));
        }
        out.push_str(&reply);
        out.push_str("\n\n");
        out.push_str(FINISH_HINT);
        vec![Reply::text(out)]
    }

    // ==================== Confirmation ====================

    async fn confirm(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        session.reduce(StateDelta::Goto(SessionState::Idle));

        if !text.contains('✅') {
            info!(session_id = %session.id, "report discarded at confirmation");
            return vec![Reply::text(
                "❌ Заявка отменена.\n\nОтправьте /start для создания новой заявки.",
            )
            .with_keyboard(Keyboard::Remove)];
        }

        let report = &session.report;
        let notification = format::format_report(report, Some(user), Local::now());
        let recipients = self.registry.load().await;
        let delivery = self.notifier.broadcast(&recipients, &notification).await;

        info!("==================================================");
        info!("📨 NEW REPORT SUBMITTED");
        info!(
            "from: {} (@{}, id: {})",
            user.first_name,
            user.username.as_deref().unwrap_or("-"),
            user.id
        );
        info!("created: {}", report.created_at().to_rfc3339());
        for field in Field::ALL {
            info!("{}: {}", field.heading(), report.display(field));
        }
        info!("delivered: {} of {}", delivery.delivered, delivery.attempted);
        info!("==================================================");

        vec![Reply::text(format!(
            "✅ ЗАЯВКА УСПЕШНО ОТПРАВЛЕНА!\n\n\
             Ваша заявка отправлена аварийному комиссару ({} получателей).\n\
             С вами свяжутся в ближайшее время.\n\n\
             Для новой заявки отправьте /start",
            delivery.attempted
        ))
        .with_keyboard(Keyboard::Remove)]
    }

    // ==================== Admin sub-flow ====================

    async fn enter_admin_menu(&self, session: &mut Session, user: &Submitter) -> Vec<Reply> {
        if !self.registry.is_recipient(user.id).await {
            return vec![self.deny(session, user.id)];
        }

        let ids = self.registry.load().await;
        session.reduce(StateDelta::Goto(SessionState::AdminMenu));
        vec![Reply::text(format!(
            "⚙️ *УПРАВЛЕНИЕ АДМИНИСТРАТОРАМИ*\n\n\
             Текущие администраторы ({}):\n{}\n\n\
             Выберите действие:",
            ids.len(),
            bullet_list(&ids, false)
        ))
        .with_keyboard(Keyboard::rows([&[ADMIN_ADD], &[ADMIN_REMOVE], &[ADMIN_LIST], &[ADMIN_BACK]]))
        .markdown()]
    }

    async fn admin_menu(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        if !self.registry.is_recipient(user.id).await {
            return vec![self.deny(session, user.id)];
        }

        if text.contains('➕') {
            session.reduce(StateDelta::Goto(SessionState::AdminAdd));
            return vec![Reply::text(
                "➕ Отправьте Telegram ID нового администратора:\n\n\
                 💡 Как узнать ID:\n\
                 1. Напишите боту @userinfobot\n\
                 2. Он отправит вам ваш ID\n\n\
                 Для отмены отправьте /cancel",
            )
            .with_keyboard(Keyboard::Remove)];
        }

        if text.contains('➖') {
            let ids = self.registry.load().await;
            if ids.is_empty() {
                session.reduce(StateDelta::Goto(SessionState::Idle));
                return vec![Reply::text("❌ Нет администраторов для удаления.")
                    .with_keyboard(Keyboard::Remove)];
            }
            session.reduce(StateDelta::Goto(SessionState::AdminRemove));
            return vec![Reply::text(format!(
                "➖ Отправьте Telegram ID администратора для удаления:\n\n\
                 Текущие администраторы:\n{}\n\n\
                 Для отмены отправьте /cancel",
                bullet_list(&ids, false)
            ))
            .with_keyboard(Keyboard::Remove)];
        }

        if text.contains('📋') {
            let ids = self.registry.load().await;
            let mut replies = vec![Reply::text(format!(
                "📋 *СПИСОК АДМИНИСТРАТОРОВ* ({}):\n\n{}",
                ids.len(),
                bullet_list(&ids, true)
            ))
            .with_keyboard(Keyboard::Remove)
            .markdown()];
            replies.extend(self.enter_admin_menu(session, user).await);
            return replies;
        }

        // Back to mode choice with a fresh session
        let (fresh, replies) = self.start(user).await;
        *session = fresh;
        replies
    }

    async fn admin_add(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        if !self.registry.is_recipient(user.id).await {
            return vec![self.deny(session, user.id)];
        }
        let Ok(id) = text.trim().parse::<UserId>() else {
            return vec![Reply::text(BAD_ID)];
        };

        let outcome = match self.registry.add(id).await {
            AddOutcome::Added => format!("✅ Администратор {} успешно добавлен!", id),
            AddOutcome::AlreadyPresent => format!("⚠️ Администратор {} уже есть в списке!", id),
            AddOutcome::SaveFailed => "❌ Ошибка при сохранении администратора.".to_string(),
        };
        let mut replies = vec![Reply::text(outcome)];
        replies.extend(self.enter_admin_menu(session, user).await);
        replies
    }

    async fn admin_remove(&self, session: &mut Session, user: &Submitter, text: &str) -> Vec<Reply> {
        if !self.registry.is_recipient(user.id).await {
            return vec![self.deny(session, user.id)];
        }
        let Ok(id) = text.trim().parse::<UserId>() else {
            return vec![Reply::text(BAD_ID)];
        };

        let outcome = match self.registry.remove(id, user.id).await {
            RemoveOutcome::Removed => format!("✅ Администратор {} успешно удалён!", id),
            RemoveOutcome::NotFound => format!("⚠️ Администратор {} не найден в списке!", id),
            RemoveOutcome::LastRecipient => LAST_RECIPIENT.to_string(),
            RemoveOutcome::SaveFailed => "❌ Ошибка при сохранении изменений.".to_string(),
        };
        let mut replies = vec![Reply::text(outcome)];
        replies.extend(self.enter_admin_menu(session, user).await);
        replies
    }

    fn deny(&self, session: &mut Session, user_id: UserId) -> Reply {
        info!(user_id, "admin access denied");
        session.reduce(StateDelta::Goto(SessionState::Idle));
        Reply::text("❌ У вас нет доступа к этой функции.").with_keyboard(Keyboard::Remove)
    }
}

fn confirmation(session: &Session) -> Reply {
    Reply::text(format!("{}\n\nПроверьте данные:", format::summary(&session.report)))
        .with_keyboard(Keyboard::rows([&[CONFIRM_SEND], &[CONFIRM_CANCEL]]))
}

/// Whole-message, case-insensitive match against the finish words.
pub fn is_finish_word(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    FINISH_WORDS.contains(&lower.as_str())
}

fn bullet_list(ids: &[UserId], code: bool) -> String {
    if ids.is_empty() {
        return "Нет администраторов".to_string();
    }
    ids.iter()
        .map(|id| if code { format!("• `{}`", id) } else { format!("• {}", id) })
        .collect::<Vec<_>>()
        .join("\n")
}
