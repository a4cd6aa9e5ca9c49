mod http_host_platform;

pub use http_host_platform::HttpHostPlatform;
