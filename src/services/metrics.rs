use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref REGISTRATIONS_COUNTER: Counter = register_counter!(
        "api_registrations_total",
        "Parent accounts created"
    ).unwrap();

    pub static ref FAMILIES_CREATED_COUNTER: Counter = register_counter!(
        "api_families_created_total",
        "Family groups created"
    ).unwrap();

    pub static ref LINK_REQUESTS_COUNTER: CounterVec = register_counter_vec!(
        "api_link_requests_total",
        "Link request lifecycle events",
        &["event"]
    ).unwrap();

    // ── Live state ──────────────────────────────────────────────────────────
    pub static ref WATCHERS_GAUGE: Gauge = register_gauge!(
        "api_child_profile_watchers",
        "Open child profile watch sockets"
    ).unwrap();
}
