//! Dashboard backend for Moltbook and ClawNews agent sessions.
//!
//! Run with: cargo run -p dashboard-server-demo
//!
//! Then open http://localhost:3000 in your browser. Settings are read from
//! `CLAW_MASTER_*` environment variables.

use anyhow::Context;
use axum::{response::Html, routing::get};
use claw_master_core::ClawMasterConfig;
use claw_master_transport::ClawMaster;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ClawMasterConfig::from_env()?;
    let claw_master = ClawMaster::from_config(&config)
        .await
        .context("failed to start dashboard backend")?;

    let app = claw_master.router().route("/", get(index_handler));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Claw Master</title>
    <style>
        body { font-family: monospace; background: #1e1e1e; color: #d4d4d4; margin: 2em; }
        section { border: 1px solid #444; padding: 1em; margin-bottom: 1em; }
        pre { white-space: pre-wrap; }
        button { margin-right: 0.5em; }
    </style>
</head>
<body>
    <h1>Claw Master</h1>
    <section data-platform="moltbook">
        <h2>Moltbook</h2>
        <input class="token" placeholder="API key" size="40">
        <button class="add">Save identity</button>
        <button class="logout">Log out</button>
        <pre class="session"></pre>
        <ul class="identities"></ul>
    </section>
    <section data-platform="clawnews">
        <h2>ClawNews</h2>
        <input class="token" placeholder="API key" size="40">
        <button class="add">Save identity</button>
        <button class="logout">Log out</button>
        <pre class="session"></pre>
        <ul class="identities"></ul>
    </section>
    <script>
        async function call(platform, method, path, body) {
            const res = await fetch(`/api/${platform}${path}`, {
                method,
                headers: { 'Content-Type': 'application/json' },
                body: body ? JSON.stringify(body) : undefined,
            });
            if (res.status === 204) return null;
            const json = await res.json();
            if (!res.ok) alert(json.error + (json.hint ? `\n${json.hint}` : ''));
            return json;
        }

        async function render(section) {
            const platform = section.dataset.platform;
            const session = await call(platform, 'GET', '/session');
            section.querySelector('.session').textContent = JSON.stringify(session, null, 2);
            const list = section.querySelector('.identities');
            list.innerHTML = '';
            for (const identity of await call(platform, 'GET', '/identities')) {
                const li = document.createElement('li');
                li.textContent = `${identity.active ? '* ' : ''}${identity.displayName} ${identity.maskedToken} `;
                const use = document.createElement('button');
                use.textContent = 'Switch';
                use.onclick = () => call(platform, 'POST', `/identities/${identity.id}/switch`);
                const del = document.createElement('button');
                del.textContent = 'Remove';
                del.onclick = () => call(platform, 'DELETE', `/identities/${identity.id}`);
                li.append(use, del);
                list.append(li);
            }
        }

        for (const section of document.querySelectorAll('section')) {
            const platform = section.dataset.platform;
            section.querySelector('.add').onclick = async () => {
                const token = section.querySelector('.token').value;
                const identity = await call(platform, 'POST', '/identities', { token });
                if (identity && identity.id) {
                    await call(platform, 'POST', `/identities/${identity.id}/switch`);
                }
            };
            section.querySelector('.logout').onclick = () => call(platform, 'POST', '/session/logout');

            const events = new EventSource(`/api/${platform}/events`);
            for (const name of ['identity_added', 'identity_updated', 'identity_removed',
                                'logged_in', 'logged_out', 'profile_refreshed', 'agent_runtime_changed']) {
                events.addEventListener(name, () => render(section));
            }
            render(section);
        }
    </script>
</body>
</html>
"#;
