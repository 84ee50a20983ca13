//! Screen implementations. Each screen is a top-level Component.

pub mod live;
pub mod register;

use std::sync::Arc;

use bmsdash_core::{ConfigApiClient, ValidatorOptions};

use crate::component::Component;
use crate::screen::ScreenId;

/// Build every screen, in tab order.
pub fn create_screens(
    client: Option<Arc<ConfigApiClient>>,
    validator_options: ValidatorOptions,
) -> Vec<(ScreenId, Box<dyn Component>)> {
    let live_screen: Box<dyn Component> = Box::new(live::LiveScreen::new());
    let register_screen: Box<dyn Component> =
        Box::new(register::RegisterScreen::new(client, validator_options));
    vec![(ScreenId::Live, live_screen), (ScreenId::Register, register_screen)]
}
