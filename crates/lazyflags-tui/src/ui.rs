pub(crate) mod loading;
pub(crate) mod modal;
pub(crate) mod picker;
pub(crate) mod text;
