/// Widgets for the desktop shell

pub mod gallery;
