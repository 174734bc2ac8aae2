//! Web UI handlers
//!
//! Server-rendered shells (Dioxus SSR + Pico CSS). Each page's inline
//! script fills itself from the console's JSON API and follows `/events`.
//!
//! - components/ - Shared Dioxus components (nav, layout)
//! - pages/ - One component per tab

pub mod components;
pub mod pages;

use axum::response::{Html, IntoResponse};
use dioxus::prelude::*;

use pages::{DashboardPage, ManualPage, MedicinePage, SchedulePage, SettingsPage};

fn render_page(page: Element) -> Html<String> {
    let html = dioxus::ssr::render_element(page);
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\" data-theme=\"dark\">\n{}</html>",
        html
    ))
}

/// GET / - Dashboard with device status
pub async fn dashboard_page() -> impl IntoResponse {
    render_page(rsx! { DashboardPage {} })
}

/// GET /schedule - Daily schedule editor
pub async fn schedule_page() -> impl IntoResponse {
    render_page(rsx! { SchedulePage {} })
}

/// GET /medicine - Slot map editor
pub async fn medicine_page() -> impl IntoResponse {
    render_page(rsx! { MedicinePage {} })
}

/// GET /manual - Manual dispense
pub async fn manual_page() -> impl IntoResponse {
    render_page(rsx! { ManualPage {} })
}

/// GET /settings - Console settings and drum reset
pub async fn settings_page() -> impl IntoResponse {
    render_page(rsx! { SettingsPage {} })
}
