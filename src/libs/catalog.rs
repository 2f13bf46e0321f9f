// Built-in catalog of amateur-radio applications the tool knows how to install.
// Entries can be overridden, or added to, by `targets` in the configuration file.

use crate::schemas::targets::{InstallTarget, ListingSource, SilentSwitches, TargetSource};

const FLDIGI_FILES: &str = "https://sourceforge.net/projects/fldigi/files";

fn sourceforge(page_url: String, link_pattern: &str) -> TargetSource {
    TargetSource::Listing(ListingSource::Page {
        page_url,
        link_pattern: link_pattern.to_string(),
    })
}

/// The catalog, in install order. Targets marked `default_on` are installed when the
/// configuration and the command line say nothing else about them.
pub fn builtin_targets() -> Vec<InstallTarget> {
    vec![
        InstallTarget::new(
            "fldigi",
            sourceforge(
                format!("{FLDIGI_FILES}/fldigi/"),
                r"fldigi-[\d.]+_x64-setup\.exe/download$",
            ),
            SilentSwitches::Nsis,
        )
        .describe("Fast Light Digital modem application")
        .default_on(),
        InstallTarget::new(
            "flrig",
            sourceforge(
                format!("{FLDIGI_FILES}/flrig/"),
                r"flrig-[\d.]+_x64-setup\.exe/download$",
            ),
            SilentSwitches::Nsis,
        )
        .describe("Transceiver control (CAT) for fldigi and friends")
        .default_on(),
        InstallTarget::new(
            "flmsg",
            sourceforge(
                format!("{FLDIGI_FILES}/flmsg/"),
                r"flmsg-[\d.]+_x64-setup\.exe/download$",
            ),
            SilentSwitches::Nsis,
        )
        .describe("Forms manager for ICS / NBEMS traffic"),
        InstallTarget::new(
            "wsjtx",
            sourceforge(
                "https://sourceforge.net/projects/wsjt/files/".to_string(),
                r"wsjtx-[\d.]+-win64\.exe/download$",
            ),
            SilentSwitches::Nsis,
        )
        .describe("Weak-signal digital modes (FT8, FT4, JT65, WSPR)")
        .detect("C:/WSJT/wsjtx/bin/wsjtx.exe")
        .default_on(),
        InstallTarget::new(
            "js8call",
            TargetSource::Direct {
                url: "http://files.js8call.com/2.2.0/js8call-2.2.0-win64.exe".to_string(),
            },
            SilentSwitches::Nsis,
        )
        .describe("Keyboard-to-keyboard messaging over JS8")
        .detect("C:/Program Files/js8call/bin/js8call.exe"),
        InstallTarget::new(
            "echolink",
            TargetSource::Direct {
                url: "https://www.echolink.org/downloads/EchoLinkSetup_2.0.908.exe".to_string(),
            },
            SilentSwitches::InnoSetup,
        )
        .describe("VoIP linking for repeaters and stations")
        .detect("C:/Program Files (x86)/K1RFD/EchoLink/EchoLink.exe")
        // Reboot initiated by the installer.
        .accept_exit_codes(&[1641]),
        InstallTarget::new(
            "qlog",
            TargetSource::Listing(ListingSource::GithubRelease {
                repo: "foldynl/QLog".to_string(),
                asset_pattern: r"(?i)win.*\.exe$".to_string(),
            }),
            SilentSwitches::InnoSetup,
        )
        .describe("Station logbook with rig and rotator control"),
    ]
}
