use crate::boundary::PathBoundary;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

#[allow(unused)]
pub fn debug_corridor(name: &str, bound: &PathBoundary) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "corridor",
            "name": name,
            "label": bound.label(),
            "blocking_id": bound.blocking_id().map(|id| format!("{:?}", id)),
            "points": bound
                .points()
                .iter()
                .map(|p| [p.s, p.lower.l, p.upper.l])
                .collect::<Vec<_>>(),
        }))
    })
}

#[cfg(feature = "debug")]
#[allow(unused)]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
