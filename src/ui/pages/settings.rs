//! Settings page component.
//!
//! Shows the effective console configuration and the dispenser connection,
//! and hosts the standalone clear-drums action.

use dioxus::prelude::*;

use crate::ui::components::Layout;

/// Client-side JavaScript for the Settings page.
const SETTINGS_SCRIPT: &str = r#"

async function loadSettings() {
    const tbody = document.getElementById('settings-table');
    try {
        const [status, settings] = await Promise.all([
            api('GET', '/status'),
            api('GET', '/api/settings')
        ]);
        const poll = settings.poll || {};
        tbody.innerHTML = `
            <tr><td>Dispenser</td><td>${esc(status.backend_url)}
                <span class="${status.backend_online ? 'status-ok' : 'status-err'}">${status.backend_online ? '✓ Online' : '✗ Offline'}</span></td></tr>
            <tr><td>Version</td><td>${esc(status.version)}</td></tr>
            <tr><td>Uptime</td><td>${status.uptime_secs}s</td></tr>
            <tr><td>Port</td><td>${esc(settings.port)}</td></tr>
            <tr><td>Request timeout</td><td>${esc(settings.request_timeout_secs)}s</td></tr>
            <tr><td>Mode lock timeout</td><td>${esc(settings.mode_lock_timeout_secs)}s</td></tr>
            <tr><td>Poll intervals</td><td><small>status ${esc(poll.status_secs)}s, logs ${esc(poll.logs_secs)}s,
                last action ${esc(poll.last_action_secs)}s, upcoming ${esc(poll.upcoming_schedules_secs)}s,
                drums ${esc(poll.dispenser_status_secs)}s</small></td></tr>
            <tr><td>Event subscribers</td><td>${status.bus_subscribers}</td></tr>
        `;
        showMode(status.mode);
    } catch (e) {
        tbody.innerHTML = `<tr><td colspan="2" class="status-err">Error: ${esc(e.message)}</td></tr>`;
    }
}

async function clearDrums() {
    if (!confirm('Clear both drums? They must be refilled from slot 1.')) return;
    try {
        const result = await api('POST', '/api/drums/clear');
        notice('clear-notice', result.message || 'Drums cleared', true);
    } catch (e) {
        notice('clear-notice', e.message, false);
    }
}

loadSettings();
setInterval(loadSettings, 15000);
"#;

/// Settings page component.
#[component]
pub fn SettingsPage() -> Element {
    rsx! {
        Layout {
            title: "Settings".to_string(),
            nav_active: "settings".to_string(),
            scripts: Some(SETTINGS_SCRIPT.to_string()),

            h1 { "Settings" }

            section { id: "console-settings",
                hgroup {
                    h2 { "Console" }
                    p { "Set with PDC_* environment variables or config.toml" }
                }
                article {
                    table {
                        tbody { id: "settings-table",
                            tr { td { colspan: "2", "Loading..." } }
                        }
                    }
                }
            }

            section { id: "drums",
                hgroup {
                    h2 { "Drums" }
                    p { "Reset the dispenser's drum positions" }
                }
                article {
                    div {
                        dangerous_inner_html: r#"<button class="secondary" onclick="clearDrums()">Clear drums</button>"#
                    }
                    p { id: "clear-notice" }
                }
            }
        }
    }
}
