use std::{path::PathBuf, str::FromStr};

use crate::{
    Portal, Resolution, Services,
    error::{PortalError, messages},
    models::{MODULES, MediaType, ModuleId, ModuleOptions, Voice},
    render::View,
};

/// Which auth form the terminal shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    Code,
    Login,
}

/// Command
///
/// One line of terminal input, parsed. Each variant maps onto exactly one
/// Portal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Modules,
    Select(ModuleId),
    Prompt(String),
    Media(MediaType),
    Voice(Voice),
    Submit,
    /// Writes a text or website result to a file (default name when `None`);
    /// for media and audio prints where to download it.
    Save(Option<PathBuf>),
    State,
    Code(String),
    Register { username: String, password: String },
    Login { username: String, password: String },
    Tab(AuthTab),
    Logout,
    Quit,
}

pub const HELP: &str = "\
help                         эта справка
modules                      список модулей
select <text|webgen|imaging|voice>
prompt <текст>               ввести запрос
media <image|video>          тип медиа для Imaging
voice <male|female|child>    голос для Voice
submit                       отправить запрос
save [файл]                  сохранить результат (сайт, текст) или показать ссылку на медиа
state                        текущее состояние
code <код>                   ввести код доступа
register <логин> <пароль>    регистрация после кода
login <логин> <пароль>       вход
tab <code|login>             переключить форму входа
logout                       выйти
quit                         завершить";

fn credentials(rest: &str) -> Result<(String, String), PortalError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(password), None) => Ok((username.to_string(), password.to_string())),
        _ => Err(PortalError::validation(messages::EMPTY_CREDENTIALS)),
    }
}

impl FromStr for Command {
    type Err = PortalError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "modules" => Command::Modules,
            "select" => Command::Select(rest.parse()?),
            "prompt" => Command::Prompt(rest.to_string()),
            "media" => Command::Media(rest.parse()?),
            "voice" => Command::Voice(rest.parse()?),
            "submit" => Command::Submit,
            "save" => Command::Save((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "state" => Command::State,
            "code" => Command::Code(rest.to_string()),
            "register" => {
                let (username, password) = credentials(rest)?;
                Command::Register { username, password }
            }
            "login" => {
                let (username, password) = credentials(rest)?;
                Command::Login { username, password }
            }
            "tab" => match rest.to_ascii_lowercase().as_str() {
                "login" => Command::Tab(AuthTab::Login),
                "code" => Command::Tab(AuthTab::Code),
                other => {
                    return Err(PortalError::Validation(format!("unknown tab: {other}")));
                }
            },
            "logout" => Command::Logout,
            "quit" | "exit" => Command::Quit,
            other => return Err(PortalError::Validation(format!("unknown command: {other}"))),
        };
        Ok(command)
    }
}

/// handle
///
/// Executes one command against the Portal and returns the lines to print.
/// Errors are returned untouched so the caller decides how to show them.
pub async fn handle(
    portal: &mut Portal,
    services: &Services,
    command: Command,
) -> Result<Vec<String>, PortalError> {
    let lines = match command {
        Command::Help => HELP.lines().map(str::to_string).collect(),
        Command::Modules => MODULES
            .iter()
            .map(|card| format!("[{}] {} ({}): {}", card.id, card.title, card.icon, card.description))
            .collect(),
        Command::Select(module) => {
            portal.controller_mut()?.select_module(module);
            vec![format!("Модуль: {}", module.card().title)]
        }
        Command::Prompt(text) => {
            portal.controller_mut()?.update_prompt(&text);
            vec![]
        }
        Command::Media(media_type) => {
            portal.controller_mut()?.set_media_type(media_type);
            vec![format!("Тип медиа: {}", media_type.as_str())]
        }
        Command::Voice(voice) => {
            portal.controller_mut()?.set_voice(voice);
            vec![format!("Голос: {}", voice.as_str())]
        }
        Command::Submit => {
            let resolution = portal
                .generate(services.generation.as_ref(), ModuleOptions::default())
                .await?;
            match (resolution, portal.controller()?.view()) {
                (Resolution::Applied, Some(view)) => {
                    let mut lines = vec!["✅ Готово! DUWDU1 обработал запрос".to_string()];
                    lines.extend(view.to_string().lines().map(str::to_string));
                    lines
                }
                _ => vec![],
            }
        }
        Command::Save(path) => save(portal, path).await?,
        Command::State => state_lines(portal),
        Command::Code(code) => {
            portal
                .gate_mut()
                .submit_code(services.auth.as_ref(), &code)
                .await?;
            vec!["Код принят. Придумайте логин и пароль: register <логин> <пароль>".to_string()]
        }
        Command::Register { username, password } => {
            portal
                .gate_mut()
                .register(services.auth.as_ref(), &username, &password)
                .await?;
            vec![format!("Добро пожаловать, {username}!")]
        }
        Command::Login { username, password } => {
            portal.gate_mut().show_login();
            portal
                .gate_mut()
                .login(services.auth.as_ref(), &username, &password)
                .await?;
            vec![format!("Добро пожаловать, {username}!")]
        }
        Command::Tab(AuthTab::Login) => {
            portal.gate_mut().show_login();
            vec![]
        }
        Command::Tab(AuthTab::Code) => {
            portal.gate_mut().show_code_entry();
            vec![]
        }
        Command::Logout => {
            portal.logout();
            vec!["Вы вышли".to_string()]
        }
        Command::Quit => vec![],
    };
    Ok(lines)
}

async fn save(portal: &Portal, path: Option<PathBuf>) -> Result<Vec<String>, PortalError> {
    let view = portal
        .controller()?
        .view()
        .ok_or_else(|| PortalError::validation(messages::NOTHING_TO_SAVE))?;

    let (content, label) = match view {
        View::Text { text } => (text, "Текст"),
        View::Website { html, .. } => (html, "Сайт"),
        View::Media { url, .. } => {
            let name = path
                .or_else(|| view.suggested_filename().map(PathBuf::from))
                .unwrap_or_default();
            return Ok(vec![
                format!("📥 Скачать: {url}"),
                format!("Имя файла: {}", name.display()),
            ]);
        }
        View::Audio { url, .. } => return Ok(vec![format!("🔊 Аудио: {url}")]),
    };

    let path = path
        .or_else(|| view.default_save_path().map(PathBuf::from))
        .unwrap_or_default();
    tokio::fs::write(&path, content).await.map_err(|err| {
        tracing::error!(path = %path.display(), error = %err, "failed to save result");
        PortalError::Save {
            path: path.display().to_string(),
            message: messages::SAVE_FAILED.to_string(),
        }
    })?;
    tracing::info!(path = %path.display(), "result saved");

    let mut lines = vec![format!("💾 {label} сохранён: {}", path.display())];
    if matches!(view, View::Website { .. }) {
        lines.push("Откройте файл в браузере, чтобы посмотреть сайт".to_string());
    }
    Ok(lines)
}

fn state_lines(portal: &Portal) -> Vec<String> {
    let gate = portal.gate();
    let mut lines = vec![format!("auth: {}", gate.state().label())];
    if let Some(username) = &gate.session().username {
        lines.push(format!("user: {username}"));
    }
    match portal.controller() {
        Ok(controller) => {
            let module = controller
                .selected_module()
                .map_or("none", ModuleId::as_str);
            lines.push(format!("module: {module}"));
            lines.push(format!("prompt: {}", controller.prompt()));
            lines.push(format!("pending: {}", controller.pending()));
            lines.push(format!("media: {}", controller.media_type().as_str()));
            lines.push(format!("voice: {}", controller.voice().as_str()));
            if let Some(view) = controller.view() {
                lines.extend(view.to_string().lines().map(str::to_string));
            }
        }
        Err(_) => lines.push("modules locked until login".to_string()),
    }
    lines
}
