//! End-to-end scenarios driven against a loopback TCP listener playing the
//! daemon role. No real `saned` is needed: the mock thread below speaks
//! just enough of the wire protocol to answer one `Session` call.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use sanelink::device::options::{set_option, ControlResult, OptionValue};
use sanelink::enums::ControlInfo;
use sanelink::session::{Session, SessionConfig};
use sanelink::wire;

fn bind_loopback() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn read_word(stream: &mut TcpStream) -> u32 {
    wire::read_word(stream).unwrap()
}

fn read_string(stream: &mut TcpStream) -> String {
    wire::read_string(stream).unwrap()
}

#[test]
fn init_handshake_succeeds() {
    let (listener, port) = bind_loopback();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _op = read_word(&mut stream);
        let _version = read_word(&mut stream);
        let _user_name = read_string(&mut stream);

        wire::write_word(&mut stream, 0).unwrap(); // Status::Good
        wire::write_word(&mut stream, sanelink::PROTOCOL_VERSION).unwrap();
        stream.flush().unwrap();
    });

    let config = SessionConfig {
        port,
        ..SessionConfig::default()
    };
    let session = Session::connect("127.0.0.1", config, |_: &str| None).unwrap();
    assert_eq!(session.state(), sanelink::SessionState::Initialized);

    server.join().unwrap();
}

#[test]
fn open_device_succeeds_without_auth() {
    let (listener, port) = bind_loopback();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        // INIT
        let _op = read_word(&mut stream);
        let _version = read_word(&mut stream);
        let _user_name = read_string(&mut stream);
        wire::write_word(&mut stream, 0).unwrap();
        wire::write_word(&mut stream, sanelink::PROTOCOL_VERSION).unwrap();
        stream.flush().unwrap();

        // OPEN
        let _op = read_word(&mut stream);
        let _name = read_string(&mut stream);
        wire::write_word(&mut stream, 0).unwrap(); // Status::Good
        wire::write_word(&mut stream, 7).unwrap(); // handle
        wire::write_string(&mut stream, "").unwrap(); // no resource challenge
        stream.flush().unwrap();
    });

    let config = SessionConfig {
        port,
        ..SessionConfig::default()
    };
    let mut session = Session::connect("127.0.0.1", config, |_: &str| None).unwrap();
    let device = session.open_device("test:0").unwrap();
    assert_eq!(device.handle(), 7);
    assert_eq!(session.state(), sanelink::SessionState::DeviceOpen(7));

    server.join().unwrap();
}

#[test]
fn backend_clamps_an_out_of_range_set() {
    let (listener, port) = bind_loopback();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();

        // INIT
        let _ = read_word(&mut stream);
        let _ = read_word(&mut stream);
        let _ = read_string(&mut stream);
        wire::write_word(&mut stream, 0).unwrap();
        wire::write_word(&mut stream, sanelink::PROTOCOL_VERSION).unwrap();
        stream.flush().unwrap();

        // OPEN
        let _ = read_word(&mut stream);
        let _ = read_string(&mut stream);
        wire::write_word(&mut stream, 0).unwrap();
        wire::write_word(&mut stream, 1).unwrap(); // handle
        wire::write_string(&mut stream, "").unwrap();
        stream.flush().unwrap();

        // GET_OPTION_DESCRIPTORS: one option ("resolution", Int, no
        // constraint) plus the trailing terminator slot.
        let _ = read_word(&mut stream); // op
        let _ = read_word(&mut stream); // handle
        wire::write_word(&mut stream, 0).unwrap(); // Status::Good
        wire::write_word(&mut stream, 2).unwrap(); // length: 1 option + terminator

        wire::write_pointer(&mut stream, true).unwrap();
        wire::write_string(&mut stream, "resolution").unwrap();
        wire::write_string(&mut stream, "Resolution").unwrap();
        wire::write_string(&mut stream, "Scan resolution in DPI").unwrap();
        wire::write_word(&mut stream, 1).unwrap(); // ValueType::Int
        wire::write_word(&mut stream, 4).unwrap(); // Unit::Dpi
        wire::write_word(&mut stream, 4).unwrap(); // element_size
        wire::write_word(&mut stream, 1 | 4).unwrap(); // SOFT_SELECT | SOFT_DETECT
        wire::write_word(&mut stream, 0).unwrap(); // ConstraintType::None
        stream.flush().unwrap();

        // CONTROL_OPTION (set): reply with the clamped value and the
        // inexact info bit set.
        let _op = read_word(&mut stream);
        let _handle = read_word(&mut stream);
        let _index = read_word(&mut stream);
        let _action = read_word(&mut stream);
        let _value_type = read_word(&mut stream);
        let value_size = read_word(&mut stream);
        let mut payload = vec![0u8; value_size as usize];
        stream.read_exact(&mut payload).unwrap();

        wire::write_word(&mut stream, 0).unwrap(); // Status::Good
        wire::write_word(&mut stream, 1).unwrap(); // ControlInfo::INEXACT
        wire::write_word(&mut stream, 1).unwrap(); // ValueType::Int
        wire::write_word(&mut stream, 4).unwrap(); // value_size
        wire::write_word(&mut stream, 1200).unwrap(); // clamped value
        wire::write_string(&mut stream, "").unwrap();
        stream.flush().unwrap();
    });

    let config = SessionConfig {
        port,
        ..SessionConfig::default()
    };
    let mut session = Session::connect("127.0.0.1", config, |_: &str| None).unwrap();
    let mut device = session.open_device("test:0").unwrap();

    let ControlResult { value, info } =
        set_option(&mut session, &mut device, 0, OptionValue::Int(vec![2400])).unwrap();
    assert_eq!(value, OptionValue::Int(vec![1200]));
    assert!(info.contains(ControlInfo::INEXACT));

    server.join().unwrap();
}
