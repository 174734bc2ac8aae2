//! Medicine page component.
//!
//! Slot map per drum: list, add a batch (clamped to free slots), remove.

use dioxus::prelude::*;

use crate::model::{Drum, MAX_SLOTS_PER_DRUM};
use crate::ui::components::Layout;

/// Client-side JavaScript for the Medicine page.
const MEDICINE_SCRIPT: &str = r#"

function renderDrum(view) {
    const n = view.drum;
    document.getElementById(`capacity-${n}`).textContent = view.capacity_label;
    document.getElementById(`add-count-${n}`).disabled = view.full;
    document.getElementById(`add-count-${n}`).max = view.available_slots;
    document.getElementById(`add-btn-${n}`).disabled = view.full;
    const tbody = document.getElementById(`medicines-${n}`);
    tbody.innerHTML = view.entries.length ? view.entries.map(e => `
        <tr>
            <td>${esc(e.slot)}</td>
            <td>${esc(e.pillName)}</td>
            <td><button class="outline secondary" onclick="removeMedicine(${n}, ${Number(e.slot)})">Remove</button></td>
        </tr>`).join('') : '<tr><td colspan="3"><small>No medicines</small></td></tr>';
}

function renderAll(views) {
    views.forEach(renderDrum);
}

async function loadMedicines() {
    try {
        renderAll(await api('GET', '/api/medicines'));
    } catch (e) {
        notice('medicine-notice', e.message, false);
    }
}

async function reloadMedicines() {
    try {
        renderAll(await api('POST', '/api/medicines/reload'));
        notice('medicine-notice', 'Slot map reloaded', true);
    } catch (e) {
        notice('medicine-notice', e.message, false);
    }
}

async function generateInputs(drum) {
    const requested = parseInt(document.getElementById(`add-count-${drum}`).value, 10) || 0;
    const inputs = document.getElementById(`new-medicines-${drum}`);
    try {
        const count = await api('POST', '/api/medicines/count', { drum, count: requested });
        if (count.notice) notice(`add-notice-${drum}`, count.notice, false);
        else notice(`add-notice-${drum}`, '', true);
        document.getElementById(`add-count-${drum}`).value = count.accepted;
        inputs.innerHTML = Array.from({ length: count.accepted }, (_, i) =>
            `<input type="text" class="new-medicine-${drum}" placeholder="Medicine ${i + 1}">`).join('');
        document.getElementById(`save-btn-${drum}`).style.display = count.accepted ? '' : 'none';
    } catch (e) {
        notice(`add-notice-${drum}`, e.message, false);
    }
}

async function saveMedicines(drum) {
    const names = Array.from(document.querySelectorAll(`.new-medicine-${drum}`)).map(i => i.value);
    try {
        const result = await api('POST', '/api/medicines', { drum, names });
        notice(`add-notice-${drum}`, result.message || 'Medicines saved', true);
        document.getElementById(`new-medicines-${drum}`).innerHTML = '';
        document.getElementById(`save-btn-${drum}`).style.display = 'none';
        renderAll(result.drums);
    } catch (e) {
        notice(`add-notice-${drum}`, e.message, false);
    }
}

async function removeMedicine(drum, slot) {
    if (!confirm(`Remove the medicine in Drum ${drum}, Slot ${slot}?`)) return;
    try {
        const result = await api('POST', '/api/medicines/remove', { drum, slot });
        notice('medicine-notice', result.message || 'Medicine removed', true);
        renderAll(result.drums);
    } catch (e) {
        notice('medicine-notice', e.message, false);
    }
}

loadMedicines();

const es = new EventSource('/events');
es.onmessage = (e) => {
    try {
        const event = JSON.parse(e.data);
        if (event.type === 'SlotMapUpdated') loadMedicines();
    } catch (err) { console.error('SSE parse error:', err); }
};
es.onerror = () => {
    console.warn('SSE disconnected, falling back to polling');
    es.close();
    setInterval(loadMedicines, 15000);
};
"#;

#[derive(Props, Clone, PartialEq)]
struct DrumMedicinesProps {
    drum: Drum,
}

/// Slot table and add form for one drum.
#[component]
fn DrumMedicines(props: DrumMedicinesProps) -> Element {
    let n = props.drum.number();
    let add_form = format!(
        r#"<div class="controls">
            <input type="number" id="add-count-{n}" min="1" max="{MAX_SLOTS_PER_DRUM}" value="1" style="max-width:6rem">
            <button id="add-btn-{n}" onclick="generateInputs({n})">Add medicines</button>
        </div>
        <div id="new-medicines-{n}"></div>
        <button id="save-btn-{n}" style="display:none" onclick="saveMedicines({n})">Save</button>"#
    );

    rsx! {
        article {
            header {
                strong { "Drum {n} " }
                small { id: "capacity-{n}" }
            }
            table {
                thead {
                    tr {
                        th { "Slot" }
                        th { "Medicine" }
                        th { "" }
                    }
                }
                tbody { id: "medicines-{n}",
                    tr { td { colspan: "3", "Loading..." } }
                }
            }
            div { dangerous_inner_html: "{add_form}" }
            p { id: "add-notice-{n}" }
        }
    }
}

/// Medicine configuration page component.
#[component]
pub fn MedicinePage() -> Element {
    rsx! {
        Layout {
            title: "Medicine".to_string(),
            nav_active: "medicine".to_string(),
            scripts: Some(MEDICINE_SCRIPT.to_string()),

            hgroup {
                h1 { "Medicine" }
                p { "Each drum holds up to {MAX_SLOTS_PER_DRUM} medicines" }
            }
            div {
                dangerous_inner_html: r#"<button class="outline" onclick="reloadMedicines()">Reload from dispenser</button>"#
            }
            p { id: "medicine-notice" }

            div { class: "drum-grid",
                for drum in Drum::ALL {
                    DrumMedicines { drum }
                }
            }
        }
    }
}
