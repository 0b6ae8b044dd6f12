/// Spawns a task on a [`TaskPool`](crate::TaskPool), optionally inside its
/// own tracing span.
///
/// When the *calling* crate enables its `tracing` feature, the task runs in a
/// root `trace_span` that follows from the span current at the spawn site, so
/// pump activity can be correlated with the subscription that started it.
///
/// # Syntax
///
/// ```text
/// // Span without fields:
/// quell_async::spawn!(pool, "pump", async { ... })
///
/// // Span with fields (parenthesised):
/// quell_async::spawn!(pool, "pump", (?effect_id, key = key.get()), async { ... })
/// ```
#[macro_export]
macro_rules! spawn {
    ($pool:expr, $name:literal, async $($rest:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            let task = async $($rest)*;
            let span = tracing::trace_span!(parent: None, $name);
            span.follows_from(tracing::Span::current());
            $pool.spawn(tracing::Instrument::instrument(task, span))
        }
        #[cfg(not(feature = "tracing"))]
        {
            $pool.spawn(async $($rest)*)
        }
    }};

    ($pool:expr, $name:literal, ($($field:tt)*), async $($rest:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            let task = async $($rest)*;
            let span = tracing::trace_span!(parent: None, $name, $($field)*);
            span.follows_from(tracing::Span::current());
            $pool.spawn(tracing::Instrument::instrument(task, span))
        }
        #[cfg(not(feature = "tracing"))]
        {
            $pool.spawn(async $($rest)*)
        }
    }};
}
