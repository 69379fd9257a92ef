use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use exam_core::model::{AnswerPair, AttemptId, OptionId, QuestionId, TestId, UserId};
use services::{
    AnswerSubmissionEndpoint, ApiClient, ApiError, AuthContext, ClientConfig, DefinitionError,
    SubjectiveAnswer, SubmissionError, TestFilter, TestService,
};

/// One-shot HTTP server: answers the first request with a canned response
/// and hands back the raw request text.
struct StubServer {
    base_url: String,
    request: JoinHandle<String>,
}

impl StubServer {
    async fn respond(status_line: &'static str, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let request = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            raw
        });
        Self {
            base_url: format!("http://{addr}/"),
            request,
        }
    }

    fn client(&self, auth: AuthContext) -> ApiClient {
        ApiClient::new(&ClientConfig::default().with_base_url(&self.base_url), auth).unwrap()
    }

    async fn received(self) -> String {
        self.request.await.unwrap()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);
        if let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

fn has_header(request: &str, header: &str) -> bool {
    request
        .lines()
        .any(|line| line.eq_ignore_ascii_case(header))
}

#[tokio::test]
async fn unauthorized_clears_token_after_sending_bearer() {
    let server = StubServer::respond("401 Unauthorized", "{}").await;
    let auth = AuthContext::with_token("tok");
    let tests = TestService::new(server.client(auth.clone()));

    let err = tests.list_tests(&TestFilter::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(status) if status == StatusCode::UNAUTHORIZED));
    assert!(!auth.is_logged_in());

    let request = server.received().await;
    assert!(request.starts_with("GET /tests HTTP/1.1"));
    assert!(has_header(&request, "authorization: Bearer tok"));
}

#[tokio::test]
async fn forbidden_submission_logs_out_instead_of_rejecting() {
    let server = StubServer::respond("403 Forbidden", "").await;
    let auth = AuthContext::with_token("tok");
    let tests = TestService::new(server.client(auth.clone()));

    let err = tests
        .submit_answers(AttemptId::new(3), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Api(ApiError::Unauthorized(status)) if status == StatusCode::FORBIDDEN
    ));
    assert!(!auth.is_logged_in());
    server.received().await;
}

#[tokio::test]
async fn no_authorization_header_without_token() {
    let server = StubServer::respond("200 OK", "[]").await;
    let tests = TestService::new(server.client(AuthContext::new()));

    let listed = tests.tests_for_teacher(UserId::new(8)).await.unwrap();
    assert!(listed.is_empty());

    let request = server.received().await;
    assert!(request.starts_with("GET /tests/teacher/8 HTTP/1.1"));
    assert!(!request.to_ascii_lowercase().contains("authorization:"));
}

#[tokio::test]
async fn missing_test_maps_to_not_found() {
    let server = StubServer::respond("404 Not Found", r#"{"message":"Test not found"}"#).await;
    let tests = TestService::new(server.client(AuthContext::with_token("tok")));

    let err = tests.get_test(TestId::new(9), false).await.unwrap_err();
    assert!(matches!(err, DefinitionError::NotFound(id) if id == TestId::new(9)));

    let request = server.received().await;
    assert!(request.starts_with("GET /tests/9?withSolutions=false HTTP/1.1"));
}

#[tokio::test]
async fn client_error_on_submit_is_a_rejection_with_server_reason() {
    let body = r#"{"message":"attempt already submitted"}"#;
    let server = StubServer::respond("422 Unprocessable Entity", body).await;
    let auth = AuthContext::with_token("tok");
    let tests = TestService::new(server.client(auth.clone()));

    let pairs = vec![AnswerPair {
        question_id: QuestionId::new(1),
        option_id: OptionId::new("a"),
    }];
    let err = tests
        .submit_answers(AttemptId::new(42), &pairs)
        .await
        .unwrap_err();
    match err {
        SubmissionError::Rejected { reason } => assert_eq!(reason, body),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(auth.is_logged_in());

    let request = server.received().await;
    assert!(request.starts_with("POST /tests/attempts/42/objective-answers HTTP/1.1"));
    assert!(request.ends_with(
        r#"{"answers":[{"objectiveQuestionId":1,"selectedOptionOriginalId":"a"}]}"#
    ));
}

#[tokio::test]
async fn server_error_on_submit_is_not_a_rejection() {
    let server = StubServer::respond("500 Internal Server Error", "boom").await;
    let tests = TestService::new(server.client(AuthContext::with_token("tok")));

    let err = tests
        .submit_answers(AttemptId::new(1), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Api(ApiError::HttpStatus { status, .. })
            if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
    server.received().await;
}

#[tokio::test]
async fn delete_test_sends_teacher_in_body() {
    let server = StubServer::respond("200 OK", "{}").await;
    let tests = TestService::new(server.client(AuthContext::with_token("tok")));

    tests.delete_test(TestId::new(5), UserId::new(8)).await.unwrap();

    let request = server.received().await;
    assert!(request.starts_with("DELETE /tests/5 HTTP/1.1"));
    assert!(request.ends_with(r#"{"teacherId":8}"#));
}

#[tokio::test]
async fn subjective_answers_are_posted_to_their_own_endpoint() {
    let server = StubServer::respond("201 Created", "{}").await;
    let tests = TestService::new(server.client(AuthContext::with_token("tok")));

    let answers = vec![SubjectiveAnswer {
        question_id: QuestionId::new(4),
        answer_text: "F = ma".into(),
    }];
    tests
        .submit_subjective_answers(AttemptId::new(12), &answers)
        .await
        .unwrap();

    let request = server.received().await;
    assert!(request.starts_with("POST /tests/attempts/12/subjective-answers HTTP/1.1"));
    assert!(request.ends_with(r#"{"answers":[{"subjectiveQuestionId":4,"answerText":"F = ma"}]}"#));
}

#[tokio::test]
async fn test_attempts_are_filtered_by_teacher() {
    let server =
        StubServer::respond("200 OK", r#"[{"id": 3, "testId": 5, "studentId": 21, "score": 7}]"#)
            .await;
    let tests = TestService::new(server.client(AuthContext::with_token("tok")));

    let attempts = tests
        .test_attempts(TestId::new(5), UserId::new(8))
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].student_id, Some(UserId::new(21)));

    let request = server.received().await;
    assert!(request.starts_with("GET /tests/5/attempts?teacherId=8 HTTP/1.1"));
}
