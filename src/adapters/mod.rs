//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                  |
//! |------------|-------------------------|------------------------------|
//! | `hardware` | SamplePort, FeedbackPort| ESP32 ADC1, feedback GPIO    |
//! | `log_sink` | EventSink               | Serial log output            |
//! | `params`   | ParamStore              | In-memory postcard blobs     |
//! | `time`     | Clock                   | ESP32 high-resolution timer  |

pub mod hardware;
pub mod log_sink;
pub mod params;
pub mod time;
