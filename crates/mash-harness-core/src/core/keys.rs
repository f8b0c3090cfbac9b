// crates/mash-harness-core/src/core/keys.rs
// ============================================================================
// Module: Output Keys and Enumerated Values
// Description: Centralized string constants for handler output maps.
// Purpose: Keep expectation checkers stable against handler refactors.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Every key an action handler writes into its output map is declared here,
//! together with the enumerated string values shared between handlers and
//! expectation checkers. Handlers never inline output-key literals.

// ============================================================================
// SECTION: Connection Keys
// ============================================================================

/// Set when a connection attempt succeeded or failed.
pub const CONNECTION_ESTABLISHED: &str = "connection_established";
/// Set when a connection was closed by the handler or the peer.
pub const CONNECTION_CLOSED: &str = "connection_closed";
/// Set when a connection is currently open.
pub const CONNECTION_OPEN: &str = "connection_open";
/// Set when a local send was refused before any bytes hit the wire.
pub const CONNECTION_ERROR: &str = "connection_error";
/// Coarse lifecycle state label for the affected connection.
pub const STATE: &str = "state";
/// Zone identifier echoed by zone-scoped connection handlers.
pub const ZONE_ID: &str = "zone_id";
/// Set when a zone connection was found and torn down.
pub const ZONE_DISCONNECTED: &str = "zone_disconnected";
/// Stable error code for step-domain failures.
pub const ERROR_CODE: &str = "error_code";
/// Free-form error description for protocol inconsistencies.
pub const ERROR: &str = "error";
/// Target echoed by handlers that failed to connect but resolved the target.
pub const TARGET: &str = "target";
/// Set when reconnect monitoring was armed.
pub const MONITORING_ACTIVE: &str = "monitoring_active";
/// Set when a session-health probe succeeded.
pub const SESSION_HEALTHY: &str = "session_healthy";
/// Set when TLS is active on the selected connection.
pub const TLS_ACTIVE: &str = "tls_active";
/// Negotiated TLS protocol version label.
pub const TLS_VERSION: &str = "tls_version";
/// Set when the TLS session issued a resumption ticket.
pub const SESSION_TICKET_RECEIVED: &str = "session_ticket_received";
/// Set when both directions of the link carried traffic.
pub const BIDIRECTIONAL_ACTIVE: &str = "bidirectional_active";
/// Set when a peer certificate snapshot is held on the connection.
pub const PEER_CERTIFICATE_PRESENT: &str = "peer_certificate_present";

// ============================================================================
// SECTION: Messaging Keys
// ============================================================================

/// Set when a raw payload was written to the wire.
pub const RAW_SENT: &str = "raw_sent";
/// Set when an inbound payload parsed as a protocol message.
pub const PARSE_SUCCESS: &str = "parse_success";
/// Set when a correlated response arrived.
pub const RESPONSE_RECEIVED: &str = "response_received";
/// Message identifier echoed by the correlated response.
pub const RESPONSE_MESSAGE_ID: &str = "response_message_id";
/// Status code carried by an error response.
pub const ERROR_STATUS: &str = "error_status";
/// Set when an attribute read completed.
pub const READ_SUCCESS: &str = "read_success";
/// Set when an attribute write completed.
pub const WRITE_SUCCESS: &str = "write_success";
/// Value returned by an attribute read.
pub const VALUE: &str = "value";
/// Set when a control pong matched the outstanding ping.
pub const PONG_RECEIVED: &str = "pong_received";
/// Sequence number carried by the matched pong.
pub const PONG_SEQ: &str = "pong_seq";
/// Set when the ping round-trip beat the configured bound.
pub const LATENCY_UNDER: &str = "latency_under";
/// Elapsed deadline reported with timeout synthesis.
pub const TIMEOUT_AFTER: &str = "timeout_after";
/// Set when a notification was consumed from the queue.
pub const NOTIFICATION_RECEIVED: &str = "notification_received";
/// Event type of the consumed notification.
pub const NOTIFICATION_EVENT: &str = "notification_event";
/// Number of notifications drained from the queue.
pub const NOTIFICATIONS_DRAINED: &str = "notifications_drained";
/// Set when a subscription was established.
pub const SUBSCRIPTION_ACTIVE: &str = "subscription_active";
/// Numeric subscription identifier.
pub const SUBSCRIPTION_ID: &str = "subscription_id";
/// Number of concurrent responses gathered.
pub const RESPONSES_RECEIVED: &str = "responses_received";
/// Set when every concurrent response matched its request id.
pub const ALL_IDS_MATCHED: &str = "all_ids_matched";

// ============================================================================
// SECTION: Queue Keys
// ============================================================================

/// Set when a command was appended to the pending queue.
pub const COMMAND_QUEUED: &str = "command_queued";
/// Pending queue length after the operation.
pub const QUEUE_LENGTH: &str = "queue_length";
/// Set when the pending queue was empty.
pub const QUEUE_EMPTY: &str = "queue_empty";
/// Set when a queued result was consumed.
pub const RESULT_RECEIVED: &str = "result_received";
/// Action name carried by the consumed queue entry.
pub const ACTION: &str = "action";

// ============================================================================
// SECTION: Discovery Keys
// ============================================================================

/// Set when a browse operation started.
pub const DISCOVERY_STARTED: &str = "discovery_started";
/// Set when a QR payload is cached in discovery state.
pub const QR_PRESENT: &str = "qr_present";
/// QR payload string produced or parsed.
pub const QR_PAYLOAD: &str = "qr_payload";
/// Set when at least one device instance was discovered.
pub const DEVICE_FOUND: &str = "device_found";
/// Number of service instances advertised by the matched device.
pub const INSTANCES_FOR_DEVICE: &str = "instances_for_device";
/// Number of controllers discovered on the network.
pub const CONTROLLERS_FOUND: &str = "controllers_found";
/// Set when every discovery result belongs to the expected zone.
pub const ALL_RESULTS_IN_ZONE: &str = "all_results_in_zone";
/// Number of services currently held in discovery state.
pub const SERVICES_FOUND: &str = "services_found";
/// Discriminator parsed out of a QR payload.
pub const DISCRIMINATOR: &str = "discriminator";
/// Setup code parsed out of a QR payload.
pub const SETUP_CODE: &str = "setup_code";
/// Set when TXT-record validation passed for the matched service.
pub const TXT_VALID: &str = "txt_valid";

// ============================================================================
// SECTION: Zone Keys
// ============================================================================

/// Set when a zone was created.
pub const ZONE_CREATED: &str = "zone_created";
/// Set when a zone was removed.
pub const ZONE_REMOVED: &str = "zone_removed";
/// Number of zones in the zone set.
pub const ZONE_COUNT: &str = "zone_count";
/// Ordered zone identifier list.
pub const ZONES: &str = "zones";
/// Zone name echoed by zone handlers.
pub const ZONE_NAME: &str = "zone_name";
/// Zone type label echoed by zone handlers.
pub const ZONE_TYPE: &str = "zone_type";
/// Zone priority echoed by zone handlers.
pub const ZONE_PRIORITY: &str = "zone_priority";
/// CA fingerprint echoed by zone handlers.
pub const CA_FINGERPRINT: &str = "ca_fingerprint";
/// Set when a zone identifier passed derivation checks.
pub const ZONE_ID_VALID: &str = "zone_id_valid";

// ============================================================================
// SECTION: Device Keys
// ============================================================================

/// Operating state label after a device-state mutation.
pub const OPERATING_STATE: &str = "operating_state";
/// Control state label after a device-state mutation.
pub const CONTROL_STATE: &str = "control_state";
/// Process state label after a device-state mutation.
pub const PROCESS_STATE: &str = "process_state";
/// Set when a device-state mutation was applied.
pub const STATE_CHANGED: &str = "state_changed";
/// Number of active faults after the operation.
pub const FAULT_COUNT: &str = "fault_count";
/// Set when a fault was injected.
pub const FAULT_INJECTED: &str = "fault_injected";
/// Set when a fault was cleared.
pub const FAULT_CLEARED: &str = "fault_cleared";
/// Set when the device simulation was reset to factory defaults.
pub const FACTORY_RESET: &str = "factory_reset";
/// EV-connected flag after the operation.
pub const EV_CONNECTED: &str = "ev_connected";
/// Cable-plugged flag after the operation.
pub const CABLE_PLUGGED_IN: &str = "cable_plugged_in";
/// Set when a trigger frame was emitted to the remote simulator.
pub const TRIGGER_SENT: &str = "trigger_sent";

// ============================================================================
// SECTION: Commissioning and Renewal Keys
// ============================================================================

/// Set when commissioning completed.
pub const COMMISSIONING_COMPLETE: &str = "commissioning_complete";
/// Set when commissioning prerequisites held.
pub const PREREQUISITES_MET: &str = "prerequisites_met";
/// Set when the renewal request frame was sent.
pub const RENEWAL_REQUEST_SENT: &str = "renewal_request_sent";
/// Set when a CSR was received and validated.
pub const CSR_RECEIVED: &str = "csr_received";
/// Set when the certificate install frame was sent.
pub const CERT_INSTALLED: &str = "cert_installed";
/// Sequence number minted for the installed certificate.
pub const CERT_SEQUENCE: &str = "cert_sequence";
/// Set when the renewal acknowledgement reported success.
pub const RENEWAL_COMPLETE: &str = "renewal_complete";
/// Status code carried by the renewal acknowledgement.
pub const STATUS: &str = "status";
/// Active sequence number reported by the acknowledgement.
pub const ACTIVE_SEQUENCE: &str = "active_sequence";
/// Set when a grace period was configured.
pub const GRACE_PERIOD_SET: &str = "grace_period_set";
/// Configured grace period in days.
pub const GRACE_PERIOD_DAYS: &str = "grace_period_days";
/// Simulated days elapsed past certificate expiry.
pub const DAYS_PAST_EXPIRY: &str = "days_past_expiry";
/// Set when the simulated clock sits inside the grace period.
pub const IN_GRACE_PERIOD: &str = "in_grace_period";
/// Set when the simulated clock passed the grace period.
pub const GRACE_PERIOD_EXPIRED: &str = "grace_period_expired";

// ============================================================================
// SECTION: Dispatch Keys
// ============================================================================

/// Set by meta-dispatchers when the sub-action handler ran.
pub const ACTION_TRIGGERED: &str = "action_triggered";
/// Sub-action name echoed by meta-dispatchers.
pub const SUB_ACTION: &str = "sub_action";

// ============================================================================
// SECTION: Enumerated Values
// ============================================================================

/// Lifecycle label for an operational connection.
pub const STATE_OPERATIONAL: &str = "OPERATIONAL";
/// Lifecycle label for a disconnected connection.
pub const STATE_DISCONNECTED: &str = "DISCONNECTED";
/// Error-code value for the zone connection cap.
pub const CODE_MAX_CONNECTIONS_EXCEEDED: &str = "MAX_CONNECTIONS_EXCEEDED";
/// Error-code value for timeouts.
pub const CODE_TIMEOUT: &str = "TIMEOUT";
/// Error-code value for refused or failed connects.
pub const CODE_CONNECTION_FAILED: &str = "CONNECTION_FAILED";
/// Error-code value for invalid parameters surfaced as step-domain failures.
pub const CODE_INVALID_PARAMETER: &str = "INVALID_PARAMETER";
/// Error value reported when no simulation branch matched a browse.
pub const ERROR_BROWSE_TIMEOUT: &str = "browse_timeout";
/// Error value reported when no connection was available for routing.
pub const ERROR_NO_CONNECTION: &str = "no_connection";
