//! Server-rendered admin views (dioxus SSR) and Chart.js payload builders.

use dioxus::prelude::*;

use nordlead_common::EntitySnapshot;
use nordlead_store::DashboardStats;

/// Render a VirtualDom into a complete HTML document string.
fn render_to_html(dom: &VirtualDom) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\">{}</html>",
        dioxus::ssr::render(dom)
    )
}

/// Chart.js bar chart snippet for a canvas with the given id.
pub fn build_bar_chart(id: &str, data: &[(String, i64)], color: &str) -> String {
    let labels: Vec<&str> = data.iter().map(|(l, _)| l.as_str()).collect();
    let values: Vec<i64> = data.iter().map(|(_, c)| *c).collect();

    format!(
        r#"new Chart(document.getElementById('{id}'),{{type:'bar',data:{{labels:{labels},datasets:[{{data:{values},backgroundColor:'{color}'}}]}},options:{{responsive:true,plugins:{{legend:{{display:false}}}},scales:{{y:{{beginAtZero:true,ticks:{{precision:0}}}}}}}}}});"#,
        id = id,
        labels = serde_json::to_string(&labels).unwrap_or_default(),
        values = serde_json::to_string(&values).unwrap_or_default(),
        color = color,
    )
}

pub fn build_score_distribution_chart(buckets: &[(String, i64)]) -> String {
    build_bar_chart("chart-score-distribution", buckets, "#6366f1")
}

pub fn build_county_chart(counties: &[(String, i64)]) -> String {
    build_bar_chart("chart-by-county", counties, "#10b981")
}

#[derive(Clone, PartialEq)]
pub struct LeadRow {
    pub orgnr: String,
    pub name: String,
    pub county: String,
    pub score: i32,
}

impl From<&EntitySnapshot> for LeadRow {
    fn from(snapshot: &EntitySnapshot) -> Self {
        Self {
            orgnr: snapshot.orgnr.clone(),
            name: snapshot.name.clone(),
            county: snapshot.county.clone().unwrap_or_default(),
            score: snapshot.overall_score,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct DashboardData {
    // Stat tiles
    pub total: i64,
    pub active: i64,
    pub high_leads: i64,
    pub average_score: String,
    // Table + chart snippets (pre-built Chart.js JS)
    pub top_leads: Vec<LeadRow>,
    pub score_chart: String,
    pub county_chart: String,
}

/// Admin layout with a top bar.
#[allow(non_snake_case)]
#[component]
fn Layout(title: String, children: Element) -> Element {
    let full_title = format!("{title} — Nordlead");
    rsx! {
        head {
            meta { charset: "utf-8" }
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            title { "{full_title}" }
            script { src: "https://cdn.tailwindcss.com" }
            script { src: "https://cdn.jsdelivr.net/npm/chart.js@4" }
        }
        body { class: "min-h-screen bg-gray-50 font-sans text-gray-900",
            div { class: "bg-gray-900 text-white px-6 py-4 flex items-center justify-between",
                span { class: "text-lg font-semibold", "Nordlead" }
                a { href: "/logout", class: "text-sm text-gray-400 hover:text-white", "Log out" }
            }
            div { class: "p-6 max-w-6xl mx-auto",
                {children}
            }
        }
    }
}

#[allow(non_snake_case)]
#[component]
fn StatTile(label: String, value: String) -> Element {
    rsx! {
        div { class: "bg-white rounded-lg shadow p-4",
            div { class: "text-sm text-gray-500", "{label}" }
            div { class: "text-2xl font-semibold", "{value}" }
        }
    }
}

#[allow(non_snake_case)]
#[component]
fn Dashboard(data: DashboardData) -> Element {
    let charts = format!("{}\n{}", data.score_chart, data.county_chart);
    rsx! {
        Layout { title: "Dashboard".to_string(),
            div { class: "grid grid-cols-4 gap-4 mb-6",
                StatTile { label: "Companies".to_string(), value: data.total.to_string() }
                StatTile { label: "Active".to_string(), value: data.active.to_string() }
                StatTile { label: "High-score leads".to_string(), value: data.high_leads.to_string() }
                StatTile { label: "Average score".to_string(), value: data.average_score.clone() }
            }
            div { class: "grid grid-cols-2 gap-4 mb-6",
                div { class: "bg-white rounded-lg shadow p-4",
                    h2 { class: "text-sm font-medium text-gray-500 mb-2", "Score distribution" }
                    canvas { id: "chart-score-distribution" }
                }
                div { class: "bg-white rounded-lg shadow p-4",
                    h2 { class: "text-sm font-medium text-gray-500 mb-2", "Companies by county" }
                    canvas { id: "chart-by-county" }
                }
            }
            div { class: "bg-white rounded-lg shadow",
                h2 { class: "text-sm font-medium text-gray-500 px-4 pt-4", "Top leads" }
                table { class: "w-full text-sm",
                    thead {
                        tr { class: "text-left text-gray-500",
                            th { class: "px-4 py-2", "Name" }
                            th { class: "px-4 py-2", "Org number" }
                            th { class: "px-4 py-2", "County" }
                            th { class: "px-4 py-2 text-right", "Score" }
                        }
                    }
                    tbody {
                        for lead in data.top_leads.iter() {
                            tr { class: "border-t border-gray-100",
                                td { class: "px-4 py-2", "{lead.name}" }
                                td { class: "px-4 py-2 text-gray-500", "{lead.orgnr}" }
                                td { class: "px-4 py-2", "{lead.county}" }
                                td { class: "px-4 py-2 text-right font-medium", "{lead.score}" }
                            }
                        }
                    }
                }
            }
            script { "{charts}" }
        }
    }
}

pub fn render_dashboard(stats: &DashboardStats, top_leads: &[EntitySnapshot]) -> String {
    let data = DashboardData {
        total: stats.total_companies,
        active: stats.active_companies,
        high_leads: stats.high_score_leads,
        average_score: format!("{:.0}", stats.average_score),
        top_leads: top_leads.iter().map(LeadRow::from).collect(),
        score_chart: build_score_distribution_chart(&stats.score_distribution),
        county_chart: build_county_chart(&stats.by_county),
    };
    let mut dom = VirtualDom::new_with_props(Dashboard, DashboardProps { data });
    dom.rebuild_in_place();
    render_to_html(&dom)
}

#[allow(non_snake_case)]
#[component]
fn Login(error: Option<String>) -> Element {
    rsx! {
        head {
            meta { charset: "utf-8" }
            title { "Log in — Nordlead" }
            script { src: "https://cdn.tailwindcss.com" }
        }
        body { class: "min-h-screen bg-gray-50 flex items-center justify-center",
            form {
                method: "post",
                action: "/login",
                class: "bg-white rounded-lg shadow p-6 w-80",
                h1 { class: "text-lg font-semibold mb-4", "Nordlead" }
                if let Some(error) = error.as_ref() {
                    p { class: "text-sm text-red-600 mb-2", "{error}" }
                }
                input {
                    r#type: "password",
                    name: "password",
                    placeholder: "Admin password",
                    class: "w-full border border-gray-300 rounded px-3 py-2 mb-4",
                }
                button {
                    r#type: "submit",
                    class: "w-full bg-gray-900 text-white rounded px-3 py-2",
                    "Log in"
                }
            }
        }
    }
}

pub fn render_login(error: Option<String>) -> String {
    let mut dom = VirtualDom::new_with_props(Login, LoginProps { error });
    dom.rebuild_in_place();
    render_to_html(&dom)
}
