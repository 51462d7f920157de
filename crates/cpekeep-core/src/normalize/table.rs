// ── Logical path table ──
//
// Immutable registry: logical name -> one template per dialect, plus an
// ordered list of vendor overrides for settings that move around between
// vendors. Placeholders:
//
//   {ssid}   per-SSID object (TR-098 WLANConfiguration, TR-181 SSID/AccessPoint)
//   {radio}  per-radio object (TR-098 WLANConfiguration, TR-181 Radio)
//   {idx}    port mapping / Ethernet interface instance

use std::collections::HashMap;
use std::sync::LazyLock;

use super::detect::Dialect;

/// Templates of one logical setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTemplate {
    pub logical: &'static str,
    pub tr098: &'static str,
    pub tr181: &'static str,
}

impl PathTemplate {
    pub fn for_dialect(&self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Tr098 => self.tr098,
            Dialect::Tr181 => self.tr181,
        }
    }

    /// Category prefix (`wifi`, `wan`, ...).
    pub fn category(&self) -> &'static str {
        self.logical
            .split_once('.')
            .map_or(self.logical, |(head, _)| head)
    }
}

/// A vendor-specific alternative path, tried before the dialect template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorOverride {
    /// Lowercase manufacturer fragment.
    pub vendor: &'static str,
    pub dialect: Dialect,
    pub logical: &'static str,
    pub template: &'static str,
}

macro_rules! paths {
    ($( $logical:literal => $tr098:literal, $tr181:literal; )*) => {
        &[ $( PathTemplate { logical: $logical, tr098: $tr098, tr181: $tr181 }, )* ]
    };
}

pub static PATHS: &[PathTemplate] = paths! {
    // ── Device info ──
    "device.manufacturer" => "InternetGatewayDevice.DeviceInfo.Manufacturer", "Device.DeviceInfo.Manufacturer";
    "device.model" => "InternetGatewayDevice.DeviceInfo.ModelName", "Device.DeviceInfo.ModelName";
    "device.serial" => "InternetGatewayDevice.DeviceInfo.SerialNumber", "Device.DeviceInfo.SerialNumber";
    "device.firmware" => "InternetGatewayDevice.DeviceInfo.SoftwareVersion", "Device.DeviceInfo.SoftwareVersion";
    "device.hardware" => "InternetGatewayDevice.DeviceInfo.HardwareVersion", "Device.DeviceInfo.HardwareVersion";
    "device.uptime" => "InternetGatewayDevice.DeviceInfo.UpTime", "Device.DeviceInfo.UpTime";
    "device.reboot" => "InternetGatewayDevice.X_TP_Reboot", "Device.Reboot";

    // ── WAN PPP ──
    "wan.ppp.username" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Username", "Device.PPP.Interface.1.Username";
    "wan.ppp.password" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Password", "Device.PPP.Interface.1.Password";
    "wan.ppp.ip" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.ExternalIPAddress", "Device.PPP.Interface.1.IPCP.LocalIPAddress";
    "wan.ppp.status" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.ConnectionStatus", "Device.PPP.Interface.1.Status";
    "wan.ppp.uptime" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Uptime", "Device.PPP.Interface.1.Stats.ConnectionUptime";

    // ── WAN IP ──
    "wan.ip.address" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.ExternalIPAddress", "Device.IP.Interface.1.IPv4Address.1.IPAddress";
    "wan.ip.gateway" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.DefaultGateway", "Device.Routing.Router.1.IPv4Forwarding.1.GatewayIPAddress";
    "wan.ip.dns" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.DNSServers", "Device.DNS.Client.Server.1.DNSServer";
    "wan.ipv6.address" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.X_HW_IPv6Address", "Device.IP.Interface.1.IPv6Address.1.IPAddress";
    "wan.ipv6.prefix" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.X_TP_IPv6PrefixList", "Device.IP.Interface.1.IPv6Prefix.1.Prefix";
    "wan.ipv6.enable" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.X_TPLINK_IPv6Enable", "Device.IP.Interface.1.IPv6Enable";
    "wan.stats.rx_bytes" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Stats.EthernetBytesReceived", "Device.PPP.Interface.1.Stats.BytesReceived";
    "wan.stats.tx_bytes" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Stats.EthernetBytesSent", "Device.PPP.Interface.1.Stats.BytesSent";

    // ── LAN ──
    "lan.ip" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPInterface.1.IPInterfaceIPAddress", "Device.IP.Interface.2.IPv4Address.1.IPAddress";
    "lan.ip.alt" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPAddress", "Device.IP.Interface.2.IPv4Address.1.IPAddress";
    "lan.mask" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPInterface.1.IPInterfaceSubnetMask", "Device.IP.Interface.2.IPv4Address.1.SubnetMask";
    "lan.mask.alt" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.SubnetMask", "Device.IP.Interface.2.IPv4Address.1.SubnetMask";
    "lan.gateway" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPRouters", "Device.Routing.Router.1.IPv4Forwarding.1.GatewayIPAddress";
    "lan.dhcp.enable" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.DHCPServerEnable", "Device.DHCPv4.Server.Pool.1.Enable";
    "lan.dhcp.start" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.MinAddress", "Device.DHCPv4.Server.Pool.1.MinAddress";
    "lan.dhcp.end" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.MaxAddress", "Device.DHCPv4.Server.Pool.1.MaxAddress";
    "lan.dhcp.lease" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.DHCPLeaseTime", "Device.DHCPv4.Server.Pool.1.LeaseTime";
    "lan.dhcp.dns" => "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.DNSServers", "Device.DHCPv4.Server.Pool.1.DNSServers";

    // ── Wi-Fi radio ──
    "wifi.radio.enable" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.Enable", "Device.WiFi.Radio.{radio}.Enable";
    "wifi.radio.band" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.OperatingFrequencyBand", "Device.WiFi.Radio.{radio}.OperatingFrequencyBand";
    "wifi.radio.channel" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.Channel", "Device.WiFi.Radio.{radio}.Channel";
    "wifi.radio.auto_channel" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.AutoChannelEnable", "Device.WiFi.Radio.{radio}.AutoChannelEnable";
    "wifi.radio.bandwidth" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.X_TP_Bandwidth", "Device.WiFi.Radio.{radio}.OperatingChannelBandwidth";
    "wifi.radio.txpower" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.X_TP_TransmitPower", "Device.WiFi.Radio.{radio}.TransmitPower";
    "wifi.radio.standard" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.Standard", "Device.WiFi.Radio.{radio}.OperatingStandards";
    "wifi.short_gi" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.X_TP_ShortGI", "Device.WiFi.Radio.{radio}.GuardInterval";
    "wifi.beacon" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.BeaconInterval", "Device.WiFi.Radio.{radio}.BeaconPeriod";
    "wifi.rts" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.RTSThreshold", "Device.WiFi.Radio.{radio}.RTSThreshold";
    "wifi.dtim" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.DTIMInterval", "Device.WiFi.Radio.{radio}.DTIMPeriod";

    // ── Wi-Fi SSID / access point ──
    "wifi.ssid" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.SSID", "Device.WiFi.SSID.{ssid}.SSID";
    "wifi.ssid.enable" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.Enable", "Device.WiFi.SSID.{ssid}.Enable";
    // Advertisement flag; a hidden SSID reports `false`.
    "wifi.ssid.hidden" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.SSIDAdvertisementEnabled", "Device.WiFi.AccessPoint.{ssid}.SSIDAdvertisementEnabled";
    "wifi.security.mode" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.BeaconType", "Device.WiFi.AccessPoint.{ssid}.Security.ModeEnabled";
    "wifi.security.mode.alt" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.X_TP_SecurityMode", "Device.WiFi.AccessPoint.{ssid}.Security.ModeEnabled";
    "wifi.security.password" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.KeyPassphrase", "Device.WiFi.AccessPoint.{ssid}.Security.KeyPassphrase";
    "wifi.security.password.alt" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.X_TP_PreSharedKey", "Device.WiFi.AccessPoint.{ssid}.Security.PreSharedKey";
    "wifi.security.encryption" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.X_TP_Encryption", "Device.WiFi.AccessPoint.{ssid}.Security.EncryptionMode";
    "wifi.wmm" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.WMMEnable", "Device.WiFi.AccessPoint.{ssid}.WMMEnable";
    "wifi.isolation" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.IsolationEnable", "Device.WiFi.AccessPoint.{ssid}.IsolationEnable";
    "wifi.clients" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.AssociatedDevice", "Device.WiFi.AccessPoint.{ssid}.AssociatedDevice";
    "wifi.clients.count" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.TotalAssociations", "Device.WiFi.AccessPoint.{ssid}.AssociatedDeviceNumberOfEntries";
    "wifi.wps.enable" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.WPS.Enable", "Device.WiFi.AccessPoint.{ssid}.WPS.Enable";
    "wifi.wps.pin" => "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.WPS.X_TP_STAEnrolleePIN", "Device.WiFi.AccessPoint.{ssid}.WPS.PIN";

    // ── Hosts ──
    "hosts.table" => "InternetGatewayDevice.LANDevice.1.Hosts.Host", "Device.Hosts.Host";
    "hosts.count" => "InternetGatewayDevice.LANDevice.1.Hosts.HostNumberOfEntries", "Device.Hosts.HostNumberOfEntries";

    // ── Diagnostics ──
    "diag.ping.host" => "InternetGatewayDevice.IPPingDiagnostics.Host", "Device.IP.Diagnostics.IPPing.Host";
    "diag.ping.count" => "InternetGatewayDevice.IPPingDiagnostics.NumberOfRepetitions", "Device.IP.Diagnostics.IPPing.NumberOfRepetitions";
    "diag.ping.timeout" => "InternetGatewayDevice.IPPingDiagnostics.Timeout", "Device.IP.Diagnostics.IPPing.Timeout";
    "diag.ping.state" => "InternetGatewayDevice.IPPingDiagnostics.DiagnosticsState", "Device.IP.Diagnostics.IPPing.DiagnosticsState";
    "diag.ping.success_count" => "InternetGatewayDevice.IPPingDiagnostics.SuccessCount", "Device.IP.Diagnostics.IPPing.SuccessCount";
    "diag.ping.failure_count" => "InternetGatewayDevice.IPPingDiagnostics.FailureCount", "Device.IP.Diagnostics.IPPing.FailureCount";
    "diag.ping.avg_time" => "InternetGatewayDevice.IPPingDiagnostics.AverageResponseTime", "Device.IP.Diagnostics.IPPing.AverageResponseTime";
    "diag.ping.min_time" => "InternetGatewayDevice.IPPingDiagnostics.MinimumResponseTime", "Device.IP.Diagnostics.IPPing.MinimumResponseTime";
    "diag.ping.max_time" => "InternetGatewayDevice.IPPingDiagnostics.MaximumResponseTime", "Device.IP.Diagnostics.IPPing.MaximumResponseTime";
    "diag.download.url" => "InternetGatewayDevice.DownloadDiagnostics.DownloadURL", "Device.IP.Diagnostics.DownloadDiagnostics.DownloadURL";
    "diag.download.state" => "InternetGatewayDevice.DownloadDiagnostics.DiagnosticsState", "Device.IP.Diagnostics.DownloadDiagnostics.DiagnosticsState";
    "diag.download.bytes" => "InternetGatewayDevice.DownloadDiagnostics.TestBytesReceived", "Device.IP.Diagnostics.DownloadDiagnostics.TestBytesReceived";
    "diag.upload.url" => "InternetGatewayDevice.UploadDiagnostics.UploadURL", "Device.IP.Diagnostics.UploadDiagnostics.UploadURL";
    "diag.upload.state" => "InternetGatewayDevice.UploadDiagnostics.DiagnosticsState", "Device.IP.Diagnostics.UploadDiagnostics.DiagnosticsState";
    "diag.traceroute.host" => "InternetGatewayDevice.TraceRouteDiagnostics.Host", "Device.IP.Diagnostics.TraceRoute.Host";
    "diag.traceroute.state" => "InternetGatewayDevice.TraceRouteDiagnostics.DiagnosticsState", "Device.IP.Diagnostics.TraceRoute.DiagnosticsState";
    "diag.traceroute.hops" => "InternetGatewayDevice.TraceRouteDiagnostics.RouteHops", "Device.IP.Diagnostics.TraceRoute.RouteHops";

    // ── NAT ──
    "nat.portmapping" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping", "Device.NAT.PortMapping";
    "nat.portmapping.enable" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.PortMappingEnabled", "Device.NAT.PortMapping.{idx}.Enable";
    "nat.portmapping.protocol" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.PortMappingProtocol", "Device.NAT.PortMapping.{idx}.Protocol";
    "nat.portmapping.external_port" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.ExternalPort", "Device.NAT.PortMapping.{idx}.ExternalPort";
    "nat.portmapping.internal_port" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.InternalPort", "Device.NAT.PortMapping.{idx}.InternalPort";
    "nat.portmapping.internal_client" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.InternalClient", "Device.NAT.PortMapping.{idx}.InternalClient";
    "nat.portmapping.description" => "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping.{idx}.PortMappingDescription", "Device.NAT.PortMapping.{idx}.Description";

    // ── Ethernet ──
    "eth.interface" => "InternetGatewayDevice.LANDevice.1.LANEthernetInterfaceConfig", "Device.Ethernet.Interface";
    "eth.status" => "InternetGatewayDevice.LANDevice.1.LANEthernetInterfaceConfig.{idx}.Status", "Device.Ethernet.Interface.{idx}.Status";
    "eth.mac" => "InternetGatewayDevice.LANDevice.1.LANEthernetInterfaceConfig.{idx}.MACAddress", "Device.Ethernet.Interface.{idx}.MACAddress";

    // ── Firmware ──
    "firmware.current" => "InternetGatewayDevice.DeviceInfo.SoftwareVersion", "Device.DeviceInfo.SoftwareVersion";
    "firmware.available" => "InternetGatewayDevice.ManagementServer.AvailableFirmwareVersion", "Device.DeviceSummary.AvailableFirmwareVersion";

    // ── ACS management server ──
    "acs.url" => "InternetGatewayDevice.ManagementServer.URL", "Device.ManagementServer.URL";
    "acs.username" => "InternetGatewayDevice.ManagementServer.Username", "Device.ManagementServer.Username";
    "acs.password" => "InternetGatewayDevice.ManagementServer.Password", "Device.ManagementServer.Password";
    "acs.periodic_enable" => "InternetGatewayDevice.ManagementServer.PeriodicInformEnable", "Device.ManagementServer.PeriodicInformEnable";
    "acs.periodic_interval" => "InternetGatewayDevice.ManagementServer.PeriodicInformInterval", "Device.ManagementServer.PeriodicInformInterval";
};

/// Vendor overrides, tried in table order before the dialect template.
pub static VENDOR_OVERRIDES: &[VendorOverride] = &[
    // TP-Link
    VendorOverride {
        vendor: "tp-link",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.PreSharedKey.1.PreSharedKey",
    },
    VendorOverride {
        vendor: "tp-link",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.KeyPassphrase",
    },
    VendorOverride {
        vendor: "tp-link",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.X_TP_PreSharedKey",
    },
    VendorOverride {
        vendor: "tp-link",
        dialect: Dialect::Tr098,
        logical: "wifi.ssid",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.SSID",
    },
    VendorOverride {
        vendor: "tp-link",
        dialect: Dialect::Tr098,
        logical: "wifi.radio.channel",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{radio}.Channel",
    },
    // Intelbras
    VendorOverride {
        vendor: "intelbras",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.PreSharedKey.1.PreSharedKey",
    },
    VendorOverride {
        vendor: "intelbras",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.KeyPassphrase",
    },
    // ZTE (older TR-098 firmware)
    VendorOverride {
        vendor: "zte",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.PreSharedKey.1.PreSharedKey",
    },
    VendorOverride {
        vendor: "zte",
        dialect: Dialect::Tr098,
        logical: "wifi.security.password",
        template: "InternetGatewayDevice.LANDevice.1.WLANConfiguration.{ssid}.WPAKey",
    },
    // Huawei
    VendorOverride {
        vendor: "huawei",
        dialect: Dialect::Tr181,
        logical: "wifi.security.password",
        template: "Device.WiFi.AccessPoint.{ssid}.Security.KeyPassphrase",
    },
    VendorOverride {
        vendor: "huawei",
        dialect: Dialect::Tr181,
        logical: "wifi.security.password",
        template: "Device.WiFi.AccessPoint.{ssid}.Security.PreSharedKey",
    },
    // Fiberhome
    VendorOverride {
        vendor: "fiberhome",
        dialect: Dialect::Tr181,
        logical: "wifi.security.password",
        template: "Device.WiFi.AccessPoint.{ssid}.Security.KeyPassphrase",
    },
];

static INDEX: LazyLock<HashMap<&'static str, &'static PathTemplate>> =
    LazyLock::new(|| PATHS.iter().map(|p| (p.logical, p)).collect());

/// Templates for a logical name.
pub fn lookup(logical: &str) -> Option<&'static PathTemplate> {
    INDEX.get(logical).copied()
}

/// Sorted logical names, optionally restricted to one category.
pub fn list_paths(category: Option<&str>) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = PATHS
        .iter()
        .filter(|p| category.is_none_or(|c| p.category() == c))
        .map(|p| p.logical)
        .collect();
    names.sort_unstable();
    names
}

/// Lowercase alphanumerics only, so "TP-Link", "TPLINK" and "tp link"
/// compare equal.
fn vendor_key(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Overrides for `logical` on a `dialect` device whose manufacturer
/// contains the override's vendor fragment, in table order.
pub fn overrides_for<'a>(
    logical: &'a str,
    dialect: Dialect,
    manufacturer: Option<&'a str>,
) -> impl Iterator<Item = &'static VendorOverride> + 'a {
    let manufacturer = manufacturer.map(vendor_key);
    VENDOR_OVERRIDES.iter().filter(move |o| {
        o.logical == logical
            && o.dialect == dialect
            && manufacturer
                .as_deref()
                .is_some_and(|m| m.contains(&vendor_key(o.vendor)))
    })
}

/// Placeholder names (`ssid`, `radio`, `idx`) used by a template.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        found.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    found
}
