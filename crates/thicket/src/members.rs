// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

/// Injects dependencies into the fields and setter methods of an existing instance.
pub trait MembersInjector<T>: Send + Sync {
    /// Assigns every injected member of `instance`.
    fn inject_members(&self, instance: &mut T);
}

impl<T, F> MembersInjector<T> for F
where
    F: Fn(&mut T) + Send + Sync,
{
    fn inject_members(&self, instance: &mut T) {
        self(instance);
    }
}

/// Boxes a closure as a shareable members injector.
pub fn members_injector_fn<T, F>(inject: F) -> Arc<dyn MembersInjector<T>>
where
    T: 'static,
    F: Fn(&mut T) + Send + Sync + 'static,
{
    Arc::new(inject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Screen {
        title: String,
        width: u32,
    }

    #[test]
    fn injects_members_in_place() {
        let injector = members_injector_fn(|screen: &mut Screen| {
            screen.title = "home".to_string();
            screen.width = 80;
        });

        let mut screen = Screen::default();
        injector.inject_members(&mut screen);

        assert_eq!(screen.title, "home");
        assert_eq!(screen.width, 80);
    }
}
