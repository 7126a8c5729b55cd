use route_compiler_core::route::CompiledRoute;

/// Concatenates route lists, moving every catch-all route after every other
/// route. Relative order is otherwise preserved.
pub fn combine_routes<I>(route_sets: I) -> Vec<CompiledRoute>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = CompiledRoute>,
{
    let (mut routes, catch_alls): (Vec<_>, Vec<_>) = route_sets
        .into_iter()
        .flatten()
        .partition(|route| !route.catch_all);
    routes.extend(catch_alls);
    routes
}
