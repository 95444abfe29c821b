use shared::metrics_defs::{MetricDef, MetricType};

pub const RELOADS: MetricDef = MetricDef {
    name: "collector.reloads",
    metric_type: MetricType::Counter,
    description: "Configuration reloads triggered by SIGHUP. Tagged with outcome.",
};

pub const ALL_METRICS: &[MetricDef] = &[RELOADS];
