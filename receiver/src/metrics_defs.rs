use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "receiver.requests",
    metric_type: MetricType::Counter,
    description: "Export calls handled by an endpoint. Tagged with signal, outcome.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "receiver.request.duration",
    metric_type: MetricType::Histogram,
    description: "Export call duration in seconds. Tagged with signal.",
};

pub const HANDLER_SWAPS: MetricDef = MetricDef {
    name: "receiver.handler.swaps",
    metric_type: MetricType::Counter,
    description: "Handler installs and retirements. Tagged with signal, kind.",
};

pub const DRAIN_DURATION: MetricDef = MetricDef {
    name: "receiver.drain.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent waiting for in-flight calls of a retired handler, in seconds. Tagged with signal.",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS, REQUEST_DURATION, HANDLER_SWAPS, DRAIN_DURATION];
