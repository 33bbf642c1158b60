use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    serve, Form, Router,
};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::prompts::AnalysisOption;
use crate::session::{Exchange, Session};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// The form's view of the single session it drives.
struct FormSession {
    session: Session,
    last: Option<Exchange>,
    file_path: String,
    selected: i64,
}

#[derive(Clone)]
pub struct AppState {
    templates: Arc<Environment<'static>>,
    // One conversation at a time; a turn holds the lock until the service replies.
    form: Arc<Mutex<FormSession>>,
}

impl AppState {
    pub fn new(session: Session) -> Result<Self> {
        Ok(Self {
            templates: Arc::new(create_minijinja_env()?),
            form: Arc::new(Mutex::new(FormSession {
                session,
                last: None,
                file_path: String::new(),
                selected: AnalysisOption::TrendAnalysis.number(),
            })),
        })
    }
}

#[derive(Serialize)]
struct OptionView {
    number: i64,
    label: &'static str,
}

#[derive(Deserialize)]
pub struct StartForm {
    #[serde(default)]
    file_path: String,
    option: i64,
}

#[derive(Deserialize)]
pub struct SendForm {
    #[serde(default)]
    message: String,
}

type PageResult = Result<Html<String>, (StatusCode, Html<String>)>;

fn create_minijinja_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)
        .context("Failed to load index template")?;
    Ok(env)
}

fn render(
    templates: &Environment<'static>,
    form: &FormSession,
    error: Option<String>,
) -> PageResult {
    let options: Vec<OptionView> = AnalysisOption::all()
        .into_iter()
        .map(|o| OptionView {
            number: o.number(),
            label: o.label(),
        })
        .collect();
    let last = form.last.as_ref();

    templates
        .get_template("index.html")
        .and_then(|tmpl| {
            tmpl.render(context! {
                title => "PM Optimizer",
                options => options,
                selected => form.selected,
                file_path => form.file_path,
                started => form.session.is_started(),
                history => form.session.history().turns(),
                response => last.map(|e| e.response.clone()),
                image_url => last.and_then(|e| e.artifacts.image_url.clone()),
                summary => last.and_then(|e| e.artifacts.executive_summary.clone()),
                error => error,
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn index_handler(State(state): State<AppState>) -> PageResult {
    let form = state.form.lock().await;
    render(&state.templates, &form, None)
}

async fn start_handler(State(state): State<AppState>, Form(input): Form<StartForm>) -> PageResult {
    let mut form = state.form.lock().await;
    let file_path = input.file_path.trim().to_string();
    if file_path.is_empty() {
        return render(&state.templates, &form, None);
    }
    if form.session.is_started() {
        info!("Start requested while a conversation is active; ignoring");
        return render(&state.templates, &form, None);
    }

    form.file_path = file_path.clone();
    form.selected = input.option;
    let Some(option) = AnalysisOption::from_number(input.option) else {
        warn!(option = input.option, "Rejected unknown analysis option");
        let message = "Invalid input. Please enter a number between 1 and 4.".to_string();
        return render(&state.templates, &form, Some(message));
    };

    let result = form.session.start(option, &PathBuf::from(&file_path)).await;
    match result {
        Ok(exchange) => {
            form.last = Some(exchange);
            render(&state.templates, &form, None)
        }
        Err(e) => {
            error!("Failed to start analysis: {}", e);
            render(&state.templates, &form, Some(e.to_string()))
        }
    }
}

async fn send_handler(State(state): State<AppState>, Form(input): Form<SendForm>) -> PageResult {
    let mut form = state.form.lock().await;
    let message = input.message.trim();
    if message.is_empty() {
        return render(&state.templates, &form, None);
    }

    let result = form.session.send(message).await;
    match result {
        Ok(exchange) => {
            form.last = Some(exchange);
            render(&state.templates, &form, None)
        }
        Err(e) => {
            error!("Failed to send message: {}", e);
            render(&state.templates, &form, Some(e.to_string()))
        }
    }
}

async fn end_handler(State(state): State<AppState>) -> PageResult {
    let mut form = state.form.lock().await;
    form.session.end();
    form.last = None;
    render(&state.templates, &form, None)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/start", post(start_handler))
        .route("/send", post(send_handler))
        .route("/end", post(end_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, session: Session) -> Result<()> {
    let state = AppState::new(session)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
