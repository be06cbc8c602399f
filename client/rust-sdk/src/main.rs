use cozylms_client::{App, ClientConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cozylms_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CozyLMS client");

    let config = ClientConfig::load()?;
    tracing::info!(
        "Configuration loaded for environment: {:?}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );
    tracing::info!("Using API at {}", config.api_base_url);

    let app = App::new(config)?;
    app.bootstrap().await;

    match app.auth.current_user() {
        Some(user) => tracing::info!(
            "Session active for {} ({} XP, {} league)",
            user.email,
            user.xp,
            user.league.as_str()
        ),
        None => tracing::info!("No active session"),
    }

    let catalog = app.courses.catalog();
    tracing::info!("Catalog holds {} courses", catalog.len());
    for course in &catalog {
        tracing::info!(
            "{} ({} lessons, {}% complete)",
            course.title,
            course.lessons.len(),
            app.courses.get_course_progress(&course.id)
        );
    }

    if let Some(family) = app.family.family() {
        tracing::info!("Family: {} with {} members", family.name, family.member_count());
    }

    match app.blog.list().await {
        Ok(posts) => tracing::info!("Blog has {} posts", posts.len()),
        Err(e) => tracing::warn!("Blog fetch failed: {}", e),
    }

    Ok(())
}
