pub mod inpaint;
pub mod logging;
pub mod settings;
