use super::Endpoint;
use crate::request::Params;
use crate::response::IntoResponse;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Default, Clone)]
/// The registry of controllers that `Controller@action` handlers resolve
/// against.
///
/// Each controller is registered with a factory, and a set of actions.  A
/// fresh controller is constructed by the factory every time one of its
/// actions is dispatched, so controllers never share state between requests
/// unless their factory hands them shared state.
///
/// # Examples
/// ```rust
/// # use trellis::*;
/// #[derive(Default)]
/// struct Users;
///
/// impl Users {
///     fn show(&self, params: Params) -> Response {
///         Response::raw(format!("user {}", params.get("id").unwrap_or("?")))
///     }
/// }
///
/// let mut controllers = Controllers::default();
/// controllers.register("Users", Users::default).action("show", Users::show);
/// assert!(controllers.lookup("Users", "show").is_some());
/// assert!(controllers.lookup("Users", "index").is_none());
/// ```
pub struct Controllers {
    controllers: HashMap<String, HashMap<String, Arc<dyn Endpoint>>>,
}

impl Controllers {
    /// Registers a controller under the given name, returning a builder to
    /// add its actions with.  Registering the same name twice adds to the
    /// existing controller's actions.
    pub fn register<C, F>(&mut self, name: impl Into<String>, factory: F) -> ControllerBuilder<'_, C, F>
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        let name = name.into();
        log::trace!("controller: {}", name);
        ControllerBuilder {
            actions: self.controllers.entry(name).or_default(),
            factory: Arc::new(factory),
            _controller: PhantomData,
        }
    }

    /// Looks up the endpoint for the given controller's action.
    pub fn lookup(&self, controller: &str, action: &str) -> Option<&Arc<dyn Endpoint>> {
        self.controllers.get(controller)?.get(action)
    }
}

impl std::fmt::Debug for Controllers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self
            .controllers
            .iter()
            .flat_map(|(c, actions)| actions.keys().map(move |a| format!("{}@{}", c, a)))
            .collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("Controllers").field("actions", &names).finish()
    }
}

/// Adds actions to a registered controller.  Created by
/// [`Controllers::register`].
pub struct ControllerBuilder<'a, C, F> {
    actions: &'a mut HashMap<String, Arc<dyn Endpoint>>,
    factory: Arc<F>,
    _controller: PhantomData<fn() -> C>,
}

impl<'a, C, F> ControllerBuilder<'a, C, F>
where
    C: 'static,
    F: Fn() -> C + Send + Sync + 'static,
{
    /// Adds an action to the controller.  The action is a method taking a
    /// reference to a freshly built controller and the parameters.
    pub fn action<A, Res>(&mut self, name: impl Into<String>, action: A) -> &mut Self
    where
        A: Fn(&C, Params) -> Res + Send + Sync + 'static,
        Res: IntoResponse,
    {
        let factory = self.factory.clone();
        let endpoint = move |params: Params| {
            let controller = factory();
            action(&controller, params)
        };
        self.actions.insert(name.into(), Arc::new(endpoint));
        self
    }
}

impl<C, F> std::fmt::Debug for ControllerBuilder<'_, C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("controller", &std::any::type_name::<C>())
            .finish_non_exhaustive()
    }
}
