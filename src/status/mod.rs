//! Session status - gateway tracking, subsystem probes and health aggregation.

pub mod aggregator;
pub mod gateway;
pub mod probe;

pub use aggregator::{reduce, AggregateHealth, HealthAggregator, OverallHealth, ALL_COMPONENTS};
pub use gateway::{GatewayClient, GatewayState, GatewayStatus, GatewayStatusTracker, HttpGatewayClient};
pub use probe::{
    classify, GatewayProbe, HealthProbe, HealthState, HealthStatus, HttpComponentProbe,
    HttpToolProbe, ToolProbe, GATEWAY_SUBSYSTEM,
};
