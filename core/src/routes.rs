//! Route templates for the remote `/vm` API, grouped by resource.
//!
//! Instances are addressed by their name; see `validate::check_instance_name`.

pub mod instances {
    pub const LIST: &str = "instances";
    pub const CREATE: &str = "instances";
    pub const GET: &str = "instances/{name}";
    pub const DELETE: &str = "instances/{name}";
    pub const START: &str = "instances/{name}/start";
    pub const STOP: &str = "instances/{name}/stop";
    pub const HISTORY: &str = "instances/{name}/history";
}

pub mod meetings {
    pub const LIST: &str = "meetings";
    pub const GET: &str = "meetings/{meetingID}";
}

pub mod recordings {
    pub const LIST: &str = "recordings";
    pub const GET: &str = "recordings/{recordingID}";
    pub const PUBLISH: &str = "recordings/{recordingID}";
    pub const UNPUBLISH: &str = "recordings/{recordingID}";
    pub const DELETE: &str = "recordings/{recordingID}";
}

pub mod regions {
    pub const LIST: &str = "regions";
}

pub mod billing {
    pub const ACTIVITY: &str = "billing/activity";
}
