/// Scanner adapters that shell out to package-manager audit commands
mod command;
mod composer_scanner;
mod npm_scanner;

pub use composer_scanner::ComposerScanner;
pub use npm_scanner::NpmScanner;
