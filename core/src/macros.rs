/// Builds a `Vec<Child>` from heterogeneous child expressions.
///
/// Anything convertible into [`Child`](crate::Child) is accepted: nodes, text,
/// numbers, `Option`s, booleans and vectors of nodes.
///
/// ```ignore
/// let items = vec![element("li", Props::new().key("a"), children!["A"])];
/// let list = element("ul", Props::new(), children!["Items:", items, show_footer.then(|| "end")]);
/// ```
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<$crate::Child>::new()
    };
    ($($child:expr),+ $(,)?) => {
        ::std::vec![$($crate::Child::from($child)),+]
    };
}

/// Wraps a render function as a [`Component`](crate::Component) named after it.
///
/// ```ignore
/// fn counter(cx: &mut Cx<'_>, props: &Props) -> Result<Node, RenderError> { ... }
///
/// let root = mount(component!(counter), host, container, queue)?;
/// ```
#[macro_export]
macro_rules! component {
    ($render:path) => {
        $crate::Component::new(::core::stringify!($render), $render)
    };
}
