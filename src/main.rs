use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use dersimiz_client::api::HttpGateway;
use dersimiz_client::config::ClientConfig;
use dersimiz_client::locale::LocaleStore;
use dersimiz_client::notifications::{ApprovalWatcher, spawn_approval_poller};
use dersimiz_client::session::{SessionEvent, SessionStore};
use dersimiz_client::storage::{CredentialStore, LibSqlCredentialStore};
use dersimiz_client::support::{SupportUnread, spawn_unread_poller};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env().context("invalid configuration")?;

    eprintln!("Dersimiz client v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base());
    eprintln!("   Credentials: {}", config.db_path.display());

    // ── Local state ─────────────────────────────────────────────────────
    let credentials: Arc<dyn CredentialStore> = Arc::new(
        LibSqlCredentialStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open {}", config.db_path.display()))?,
    );

    let locale = LocaleStore::new(Arc::clone(&credentials));
    let language = locale.hydrate().await;
    eprintln!("   Language: {}", language.as_str());

    // ── Gateway + session ───────────────────────────────────────────────
    let gateway = Arc::new(
        HttpGateway::new(&config, Arc::clone(&credentials), locale.subscribe())
            .context("failed to build HTTP gateway")?,
    );
    let session = Arc::new(SessionStore::new(
        gateway.clone(),
        Arc::clone(&credentials),
        &config,
    ));
    let listener = session.spawn_auth_listener(gateway.auth_events());

    session.hydrate().await;
    let Some(user) = session.user().await else {
        eprintln!("   Session: signed out\n");
        listener.abort();
        return Ok(());
    };

    eprintln!(
        "   Session: {} ({}, {:?}, onboarding {})\n",
        user.full_name.as_deref().unwrap_or(&user.phone_number),
        user.role.map(|r| r.to_string()).unwrap_or_else(|| "no role".into()),
        user.approval_status(),
        if user.onboarding_completed { "complete" } else { "pending" },
    );

    // ── Background pollers ──────────────────────────────────────────────
    let watcher = Arc::new(ApprovalWatcher::new(gateway.clone(), session.clone()));
    let mut notices = watcher.subscribe();
    let approval = spawn_approval_poller(watcher, config.approval_poll_interval);

    let unread = Arc::new(SupportUnread::new(gateway.clone()));
    let support = spawn_unread_poller(Arc::clone(&unread), config.support_poll_interval);

    let mut events = session.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    eprintln!("{}", notice.message(locale.locale()));
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Unauthenticated) | Ok(SessionEvent::LoggedOut) => {
                    warn!("Session ended");
                    break;
                }
                Ok(SessionEvent::UserChanged(_)) => {}
                Err(e) => warn!(error = %e, "Session event stream error"),
            },
        }
    }

    drop(approval);
    drop(support);
    listener.abort();
    info!(unread_support = unread.count(), "Stopped");
    Ok(())
}
