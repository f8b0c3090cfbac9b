// crates/mash-harness-actions/src/registry_setup.rs
// ============================================================================
// Module: Registry Setup
// Description: Process-wide action registry wiring.
// Purpose: Register every handler once at startup and share the lookup.
// Dependencies: crate handler modules, mash-harness-core
// ============================================================================

//! ## Overview
//! The full handler family registers here. The registry is built once per
//! process and shared so meta-dispatchers can forward by name without
//! carrying a handle through every signature. `renew_cert` is an alias for
//! the chained renewal flow, matching the step vocabulary suites use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use mash_harness_core::ActionRegistry;
use mash_harness_core::registry::HandlerFn;

use crate::commissioning;
use crate::connection;
use crate::device;
use crate::discovery;
use crate::execution::Execution;
use crate::messaging;
use crate::meta;
use crate::queue;
use crate::renewal;
use crate::zones;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-wide registry instance.
static REGISTRY: OnceLock<ActionRegistry<Execution>> = OnceLock::new();

/// Returns the shared action registry, building it on first use.
pub fn registry() -> &'static ActionRegistry<Execution> {
    REGISTRY.get_or_init(|| action_table().into_iter().collect())
}

/// The complete action table.
fn action_table() -> Vec<(&'static str, HandlerFn<Execution>)> {
    vec![
        // Connection lifecycle.
        ("connect", connection::connect),
        ("disconnect", connection::disconnect),
        ("connect_as_zone", connection::connect_as_zone),
        ("disconnect_zone", connection::disconnect_zone),
        ("reconnect_to_zone", connection::reconnect_to_zone),
        ("monitor_reconnect", connection::monitor_reconnect),
        ("cancel_reconnect", connection::cancel_reconnect),
        ("probe_session_health", connection::probe_session_health),
        ("check_tls_status", connection::check_tls_status),
        // Messaging.
        ("send_ping", messaging::send_ping),
        ("measure_latency", messaging::measure_latency),
        ("read_attribute", messaging::read_attribute),
        ("write_attribute", messaging::write_attribute),
        ("concurrent_reads", messaging::concurrent_reads),
        ("subscribe", messaging::subscribe),
        ("read_subscription_update", messaging::read_subscription_update),
        ("wait_for_notification", messaging::wait_for_notification),
        ("flush_notifications", messaging::flush_notifications),
        ("send_raw", messaging::send_raw),
        ("parse_payload", messaging::parse_payload),
        ("send_close", messaging::send_close),
        // Zones.
        ("create_zone", zones::create_zone),
        ("delete_zone", zones::delete_zone),
        ("list_zones", zones::list_zones),
        ("highest_priority_zone", zones::highest_priority_zone),
        ("highest_priority_connected_zone", zones::highest_priority_connected_zone),
        ("verify_zone_id_derivation", zones::verify_zone_id_derivation),
        // Discovery.
        ("browse_mdns", discovery::browse_mdns),
        ("wait_for_device", discovery::wait_for_device),
        ("browse_controllers", discovery::browse_controllers),
        ("generate_qr_payload", discovery::generate_qr_payload),
        ("parse_qr_payload", discovery::parse_qr_payload),
        // Device simulation.
        ("set_operating_state", device::set_operating_state),
        ("set_control_state", device::set_control_state),
        ("set_process_state", device::set_process_state),
        ("set_ev_connected", device::set_ev_connected),
        ("set_cable_plugged_in", device::set_cable_plugged_in),
        ("trigger_fault", device::trigger_fault),
        ("clear_fault", device::clear_fault),
        ("factory_reset", device::factory_reset),
        ("set_device_attribute", device::set_device_attribute),
        // Commissioning.
        ("verify_commissioning_prerequisites", commissioning::verify_commissioning_prerequisites),
        ("commission", commissioning::commission),
        // Renewal and grace periods.
        ("send_renewal_request", renewal::send_renewal_request),
        ("receive_renewal_csr", renewal::receive_renewal_csr),
        ("send_cert_install", renewal::send_cert_install),
        ("receive_renewal_ack", renewal::receive_renewal_ack),
        ("full_renewal_flow", renewal::full_renewal_flow),
        ("renew_cert", renewal::full_renewal_flow),
        ("set_grace_period", renewal::set_grace_period),
        ("simulate_time_advance", renewal::simulate_time_advance),
        ("check_grace_period_status", renewal::check_grace_period_status),
        // Queueing.
        ("queue_command", queue::queue_command),
        ("wait_for_queued_result", queue::wait_for_queued_result),
        // Meta-dispatch.
        ("controller_action", meta::controller_action),
        ("device_local_action", meta::device_local_action),
    ]
}
