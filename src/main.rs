use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use complaint_triage::config::TriageConfig;
use complaint_triage::intake::intake_routes_with_reports;
use complaint_triage::llm::create_provider;
use complaint_triage::prompts::PromptTemplate;
use complaint_triage::triage::{
    AcknowledgementDispatcher, LlmAnswerService, LlmClassifier, LlmSenderExtractor, PipelineDeps,
    Router, TriagePipeline, TriageReport,
};

const ANSWER_PROMPT: &str = "acknowledge.yaml";
const ROUTER_PROMPT: &str = "router.yaml";
const EXTRACT_SENDER_PROMPT: &str = "extract_sender.yaml";
const ESCALATION_TEMPLATE: &str = "unit_escalation.html";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = TriageConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("📨 Complaint Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Sender: {}", config.email.from_address());
    eprintln!("   Units: {} routed", config.routing.len());

    // ── Collaborators ───────────────────────────────────────────────────
    let llm = create_provider(&config.llm)?;
    let mailer = config.email.build_mailer()?;
    tracing::info!(mailer = mailer.name(), "Email transport ready");

    let answer = LlmAnswerService::new(
        llm.clone(),
        PromptTemplate::load(config.prompt_dir.join(ANSWER_PROMPT))?,
        config.request_timeout,
    );
    let classifier = LlmClassifier::new(
        llm.clone(),
        PromptTemplate::load(config.prompt_dir.join(ROUTER_PROMPT))?,
        config.request_timeout,
    );
    let router = Router::from_template_file(
        Arc::new(config.routing.clone()),
        mailer.clone(),
        config.template_dir.join(ESCALATION_TEMPLATE),
    )?;

    let mut deps = PipelineDeps::new(
        Arc::new(answer),
        Arc::new(classifier),
        AcknowledgementDispatcher::new(mailer, config.company_name.clone()),
        router,
    );
    if config.extract_sender {
        let extractor = LlmSenderExtractor::new(
            llm,
            PromptTemplate::load(config.prompt_dir.join(EXTRACT_SENDER_PROMPT))?,
            config.request_timeout,
        );
        deps = deps.with_sender_extractor(Arc::new(extractor));
        eprintln!("   Sender extraction: enabled");
    }
    let pipeline = Arc::new(TriagePipeline::new(deps));

    // ── Reports ─────────────────────────────────────────────────────────
    let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel::<TriageReport>();
    tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            log_report(&report);
        }
    });

    // ── Intake server ───────────────────────────────────────────────────
    let addr = config.server.socket_addr()?;
    let app = intake_routes_with_reports(pipeline, report_tx);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind intake server on {addr}"))?;
    eprintln!("   Intake: http://{}/api/complaints\n", addr);
    tracing::info!(%addr, "Intake server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested");
        })
        .await?;

    Ok(())
}

/// Console logging, plus a daily rolling file when `log_dir` is set.
/// The returned guard must live as long as the process.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "complaint-triage.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

fn log_report(report: &TriageReport) {
    let classification = report
        .classification
        .as_ref()
        .map(|c| c.classification_name.as_str())
        .unwrap_or("-");
    if report.is_complete() {
        tracing::info!(
            complaint_id = %report.complaint_id,
            escalated = report.decision.escalate,
            classification,
            "Triage complete"
        );
    } else {
        tracing::warn!(
            complaint_id = %report.complaint_id,
            state = report.state.label(),
            acknowledgement = ?report.acknowledgement,
            routing = ?report.routing,
            "Triage incomplete"
        );
    }
}
