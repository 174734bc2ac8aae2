//! Dashboard page component.
//!
//! Shows what the pollers last saw:
//! - Device clock, current slot per drum and Wi-Fi
//! - Last action and drum fill levels
//! - Upcoming dispenses and the device log

use dioxus::prelude::*;

use crate::ui::components::Layout;

/// Client-side JavaScript for the Dashboard page.
const DASHBOARD_SCRIPT: &str = r#"

function offline(slot) {
    return slot.error ? `<p class="status-err">Offline: ${esc(slot.error)}</p>` : '';
}

function renderStatus(slot) {
    const el = document.getElementById('device-status');
    el.removeAttribute('aria-busy');
    const s = slot.data;
    if (!s) { el.innerHTML = offline(slot) || '<p>No data yet</p>'; return; }
    const wifi = s.wifi ? (typeof s.wifi === 'object' ? JSON.stringify(s.wifi) : s.wifi) : '-';
    el.innerHTML = `${offline(slot)}
        <p><strong>Device time:</strong> ${esc(s.time || '-')}</p>
        <p><strong>Drum 1 slot:</strong> ${esc(s.slotDrum1 ?? '-')} &nbsp; <strong>Drum 2 slot:</strong> ${esc(s.slotDrum2 ?? '-')}</p>
        <p><strong>Wi-Fi:</strong> <small>${esc(wifi)}</small></p>`;
}

function renderLastAction(slot) {
    const el = document.getElementById('last-action');
    const a = slot.data;
    el.innerHTML = offline(slot) + (a
        ? `<p>${esc(a.event || '-')}<br><small>${esc(a.timestamp || '')}</small></p>`
        : '<p>No action recorded</p>');
}

function renderFill(slot) {
    const el = document.getElementById('drum-fill');
    const drums = (slot.data && slot.data.drums) || [];
    el.innerHTML = offline(slot) + (drums.length ? drums.map(d => `
        <p><strong>Drum ${esc(d.drum)}</strong> ${d.isEmpty ? '<span class="status-err">empty</span>' : ''}
        <small>slot ${esc(d.currentSlot)}, ${esc(d.emptySlots)} empty</small></p>
        <div class="fill-bar"><span style="width:${Math.max(0, Math.min(100, Number(d.fillPercentage) || 0))}%"></span></div>
    `).join('') : '<p>No drum data</p>');
}

function renderUpcoming(entries) {
    const tbody = document.getElementById('upcoming');
    if (!entries.length) {
        tbody.innerHTML = '<tr><td colspan="4">Nothing scheduled</td></tr>';
        return;
    }
    tbody.innerHTML = entries.map(e => `
        <tr>
            <td>${esc(e.dateTime.replace('T', ' ').slice(0, 16))}</td>
            <td>${esc(e.medicine.pillName)}</td>
            <td>Drum ${esc(e.medicine.drum)}${e.medicine.slot ? ', Slot ' + esc(e.medicine.slot) : ''}</td>
            <td>${e.executed ? '<span class="status-ok">done</span>' : ''}</td>
        </tr>`).join('');
}

function renderLogs(slot) {
    const el = document.getElementById('logs');
    el.textContent = slot.data || slot.error || 'No logs yet';
}

async function loadSnapshot() {
    try {
        const snap = await api('GET', '/api/snapshot');
        renderStatus(snap.status);
        renderLastAction(snap.last_action);
        renderFill(snap.dispenser_status);
        renderLogs(snap.logs);
    } catch (e) {
        notice('dashboard-error', 'Error loading status: ' + e.message, false);
    }
}

async function loadUpcoming() {
    try {
        const sched = await api('GET', '/api/schedule');
        renderUpcoming(sched.upcoming);
    } catch (e) {
        console.error('Failed to load upcoming schedules:', e);
    }
}

loadSnapshot();
loadUpcoming();

const es = new EventSource('/events');
es.onmessage = (e) => {
    try {
        const event = JSON.parse(e.data);
        const p = event.payload || {};
        switch (event.type) {
            case 'StatusUpdated': renderStatus({ data: p.status }); break;
            case 'LastActionUpdated': renderLastAction({ data: p.action }); break;
            case 'DispenserStatusUpdated': renderFill({ data: p.status }); break;
            case 'LogsUpdated': renderLogs({ data: p.logs }); break;
            case 'UpcomingSchedulesUpdated':
            case 'SlotMapUpdated': loadUpcoming(); break;
            case 'PollFailed': loadSnapshot(); break;
            case 'ModeChanged': showMode(p.holder); break;
        }
    } catch (err) { console.error('SSE parse error:', err); }
};
es.onerror = () => {
    console.warn('SSE disconnected, falling back to polling');
    es.close();
    setInterval(() => { loadSnapshot(); loadUpcoming(); }, 5000);
};
"#;

/// Dashboard page component.
#[component]
pub fn DashboardPage() -> Element {
    rsx! {
        Layout {
            title: "Dashboard".to_string(),
            nav_active: "dashboard".to_string(),
            scripts: Some(DASHBOARD_SCRIPT.to_string()),

            h1 { "Dashboard" }
            p { id: "dashboard-error" }

            div { class: "drum-grid",
                article {
                    header { strong { "Device" } }
                    div { id: "device-status", aria_busy: "true", "Loading status..." }
                }
                article {
                    header { strong { "Last Action" } }
                    div { id: "last-action", "Loading..." }
                }
                article {
                    header { strong { "Drums" } }
                    div { id: "drum-fill", "Loading..." }
                }
            }

            section { id: "upcoming-schedules",
                h2 { "Upcoming" }
                table {
                    thead {
                        tr {
                            th { "When" }
                            th { "Medicine" }
                            th { "Location" }
                            th { "" }
                        }
                    }
                    tbody { id: "upcoming",
                        tr { td { colspan: "4", "Loading..." } }
                    }
                }
            }

            section {
                h2 { "Logs" }
                pre { class: "logs", id: "logs", "Loading..." }
            }
        }
    }
}
