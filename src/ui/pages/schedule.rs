//! Schedule page component.
//!
//! Daily dispense times per drum. Touching any control takes the schedule
//! mode lock; saving clears both drums afterwards.

use dioxus::prelude::*;

use crate::model::Drum;
use crate::ui::components::Layout;

/// Client-side JavaScript for the Schedule page.
const SCHEDULE_SCRIPT: &str = r#"

let lastTouch = 0;
async function touchSchedule() {
    // The lock outlives a burst of edits; no need to call on every keystroke
    const now = Date.now();
    if (now - lastTouch < 2000) return;
    lastTouch = now;
    try {
        const mode = await api('POST', '/api/schedule/touch');
        showMode(mode.holder);
        notice('schedule-notice', '', true);
    } catch (e) {
        lastTouch = 0;
        notice('schedule-notice', e.message, false);
    }
}

function syncFrequency(drum) {
    const twice = document.getElementById(`freq-${drum}`).value === 'twice';
    document.getElementById(`time2-${drum}`).parentElement.style.display = twice ? '' : 'none';
}

function drumInput(drum) {
    const frequency = document.getElementById(`freq-${drum}`).value;
    const times = [document.getElementById(`time1-${drum}`).value];
    if (frequency === 'twice') times.push(document.getElementById(`time2-${drum}`).value);
    return { frequency, times };
}

async function saveSchedules() {
    if (!confirm('Saving a new schedule clears both drums. Refill them from slot 1 afterwards. Continue?')) return;
    const btn = document.getElementById('save-schedule');
    btn.setAttribute('aria-busy', 'true');
    try {
        const result = await api('POST', '/api/schedule', { drum1: drumInput(1), drum2: drumInput(2) });
        notice('schedule-notice', result.message || 'Schedule saved', true);
        notice('clear-notice', result.clear.message || (result.clear.ok ? 'Drums cleared' : 'Clearing drums failed'), result.clear.ok);
        loadSchedule();
    } catch (e) {
        notice('schedule-notice', e.message, false);
    } finally {
        btn.removeAttribute('aria-busy');
    }
}

function describe(s) {
    return s ? `${esc(s.frequency)} at ${s.times.map(esc).join(' and ')}` : '-';
}

async function loadSchedule() {
    try {
        const sched = await api('GET', '/api/schedule');
        const saved = sched.saved;
        document.getElementById('saved-schedule').innerHTML = saved
            ? `<p><strong>Drum 1:</strong> ${describe(saved.drum1)}<br><strong>Drum 2:</strong> ${describe(saved.drum2)}</p>`
            : '<p><small>No schedule saved from this console yet</small></p>';
    } catch (e) {
        console.error('Failed to load schedule:', e);
    }
}

async function loadOptions() {
    const el = document.getElementById('schedule-medicines');
    try {
        const options = await api('GET', '/api/schedule/options');
        el.innerHTML = options.length
            ? options.map(o => `<option value="${esc(o.value)}">${esc(o.label)}</option>`).join('')
            : '<option disabled>No medicines configured</option>';
    } catch (e) {
        el.innerHTML = `<option disabled>${esc(e.message)}</option>`;
    }
}

for (const drum of [1, 2]) {
    const freq = document.getElementById(`freq-${drum}`);
    freq.addEventListener('change', () => { syncFrequency(drum); touchSchedule(); });
    for (const id of [`time1-${drum}`, `time2-${drum}`]) {
        const input = document.getElementById(id);
        input.addEventListener('focus', touchSchedule);
        input.addEventListener('change', touchSchedule);
    }
    syncFrequency(drum);
}
document.getElementById('save-schedule').addEventListener('click', saveSchedules);

loadSchedule();
loadOptions();

const es = new EventSource('/events');
es.onmessage = (e) => {
    try {
        const event = JSON.parse(e.data);
        if (event.type === 'SlotMapUpdated') loadOptions();
        if (event.type === 'SchedulesSaved') loadSchedule();
        if (event.type === 'ModeChanged') showMode(event.payload.holder);
    } catch (err) { console.error('SSE parse error:', err); }
};
es.onerror = () => {
    console.warn('SSE disconnected, falling back to polling');
    es.close();
    setInterval(loadOptions, 30000);
};
"#;

#[derive(Props, Clone, PartialEq)]
struct DrumScheduleFormProps {
    drum: Drum,
}

/// Frequency and time inputs for one drum.
#[component]
fn DrumScheduleForm(props: DrumScheduleFormProps) -> Element {
    let n = props.drum.number();

    rsx! {
        article {
            header { strong { "Drum {n}" } }
            label {
                "Frequency"
                select { id: "freq-{n}",
                    option { value: "once", "Once a day" }
                    option { value: "twice", "Twice a day" }
                }
            }
            div { class: "grid",
                label {
                    "Time"
                    input { r#type: "time", id: "time1-{n}" }
                }
                label {
                    "Second time"
                    input { r#type: "time", id: "time2-{n}" }
                }
            }
        }
    }
}

/// Schedule page component.
#[component]
pub fn SchedulePage() -> Element {
    rsx! {
        Layout {
            title: "Schedule".to_string(),
            nav_active: "schedule".to_string(),
            scripts: Some(SCHEDULE_SCRIPT.to_string()),

            h1 { "Schedule" }

            section { id: "schedule-form",
                div { class: "drum-grid",
                    for drum in Drum::ALL {
                        DrumScheduleForm { drum }
                    }
                }
                div { class: "controls",
                    button { id: "save-schedule", "Save schedule" }
                }
                p { id: "schedule-notice" }
                p { id: "clear-notice" }
            }

            section {
                hgroup {
                    h2 { "Current Schedule" }
                    p { "Last schedule saved from this console" }
                }
                article { id: "saved-schedule", "Loading..." }
            }

            section {
                hgroup {
                    h2 { "Medicines" }
                    p { "Configured on the Medicine tab" }
                }
                select { id: "schedule-medicines", multiple: true, size: "7" }
            }
        }
    }
}
