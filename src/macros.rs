/// Generates a `match` expression dispatching `StoreEvent` variants to their payload's `apply`
/// method.
///
/// Every variant wraps a payload type of the same name, so the handler table is the list of
/// identifiers passed to the macro. Adding an event means adding the variant, its payload type
/// with an `apply` method, and its identifier here; a missing arm is a compile error.
///
/// # Parameters
/// - `$event:expr`: The `StoreEvent` value to match against.
/// - `$store:expr`: The store reference (e.g., `&mut self`) passed to each `apply`.
/// - `$($event_ty:ident),*`: Comma-separated variant identifiers, each also the payload type name.
///
/// Each payload must provide:
/// ```rust,ignore
/// fn apply(self, store: &mut CalendarStore)
/// ```
///
/// # Example
/// ```rust,ignore
/// dispatch_events!(event, store, GoalCreated, StepDeleted)
/// ```
/// This expands to:
/// ```rust,ignore
/// match event {
///     StoreEvent::GoalCreated(payload) => GoalCreated::apply(payload, store),
///     StoreEvent::StepDeleted(payload) => StepDeleted::apply(payload, store),
/// }
/// ```
#[macro_export]
macro_rules! dispatch_events {
    ($event:expr, $store:expr, $($event_ty:ident),* $(,)?) => {
        match $event {
            $(
                StoreEvent::$event_ty(payload) => $event_ty::apply(payload, $store),
            )*
        }
    };
}
